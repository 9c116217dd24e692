use std::path::Path;

use crate::commands::common::{
    format_thought_lines, open_service, thought_to_list_item, ThoughtListItem,
};
use crate::error::CliError;

pub fn run_list(
    limit: usize,
    unsynced_only: bool,
    as_json: bool,
    db_path: &Path,
) -> Result<(), CliError> {
    let service = open_service(db_path)?;
    let thoughts = service.list(Some(limit), unsynced_only)?;

    if as_json {
        let json_items = thoughts
            .iter()
            .map(thought_to_list_item)
            .collect::<Vec<ThoughtListItem>>();
        println!("{}", serde_json::to_string_pretty(&json_items)?);
    } else if thoughts.is_empty() {
        println!("No thoughts yet.");
    } else {
        for line in format_thought_lines(&thoughts) {
            println!("{line}");
        }
    }

    Ok(())
}
