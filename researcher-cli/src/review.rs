//! Interactive review of generated research queries.
//!
//! Each proposed query can be kept, edited, or removed, and extra queries
//! can be appended before dispatch. Every kept query is money spent on a
//! deep research job, so the review runs before anything is submitted.

use dialoguer::{Confirm, Input, Select};
use researcher_core::queries::QueryReviewer;

/// Reviewer backed by terminal prompts.
pub struct InteractiveReviewer;

impl QueryReviewer for InteractiveReviewer {
    fn review(&self, queries: Vec<String>) -> Vec<String> {
        match review_queries(&queries) {
            Ok(reviewed) => reviewed,
            Err(err) => {
                // A broken terminal is "no decision"; the pipeline falls
                // back to the original queries.
                eprintln!("  Query review unavailable ({}), keeping all queries.", err);
                Vec::new()
            }
        }
    }
}

fn review_queries(queries: &[String]) -> dialoguer::Result<Vec<String>> {
    println!("\n  Research Queries\n");
    println!("  Review the proposed queries below. You can keep, edit, or remove them.");

    let actions = ["keep", "edit", "remove"];
    let mut final_queries: Vec<String> = Vec::new();

    for (i, query) in queries.iter().enumerate() {
        println!("\n  Query {}/{}:", i + 1, queries.len());
        println!("    {}", query);

        let action = Select::new()
            .with_prompt("Action")
            .items(&actions)
            .default(0)
            .interact()?;

        match actions[action] {
            "keep" => final_queries.push(query.clone()),
            "edit" => {
                let edited: String = Input::new()
                    .with_prompt("Enter edited query")
                    .with_initial_text(query.as_str())
                    .interact_text()?;
                if !edited.trim().is_empty() {
                    final_queries.push(edited.trim().to_string());
                }
            }
            _ => {}
        }
    }

    loop {
        let add_more = Confirm::new()
            .with_prompt("Add another query?")
            .default(false)
            .interact()?;
        if !add_more {
            break;
        }
        let new_query: String = Input::new().with_prompt("Enter new query").interact_text()?;
        if !new_query.trim().is_empty() {
            final_queries.push(new_query.trim().to_string());
        }
    }

    if final_queries.is_empty() {
        println!("\n  No queries selected; keeping all original queries.");
        return Ok(queries.to_vec());
    }

    println!("\n  Final queries ({}):", final_queries.len());
    for (i, query) in final_queries.iter().enumerate() {
        println!("    {}. {}", i + 1, query);
    }

    Ok(final_queries)
}
