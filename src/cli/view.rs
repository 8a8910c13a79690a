use std::path::Path;

use anyhow::{Context, Result};
use clap::Parser;

use crate::{
    storage::{
        data_store::LocalDataStore, entities::RecordedActivity, schema_store::LocalSchemaStore,
        DataStore, SchemaStore,
    },
    tree::CategoryTree,
    utils::{
        dir::{DATA_FILE, SCHEMA_FILE},
        time::format_moment,
    },
};

const DEFAULT_PRINTED_RECORDS: usize = 10;

#[derive(Debug, Parser)]
pub struct RecentCommand {
    #[arg(
        short = 'n',
        long = "count",
        default_value_t = DEFAULT_PRINTED_RECORDS,
        help = "Number of records to show"
    )]
    count: usize,
}

/// Prints the category tree stored in `dir` as an indented outline.
pub async fn process_tree_command(dir: &Path) -> Result<()> {
    let snapshot = LocalSchemaStore::new(dir.join(SCHEMA_FILE))
        .load()
        .await
        .context("Couldn't load schema, run a session first to create one")?;
    print!("{}", render_outline(&CategoryTree::from_snapshot(&snapshot)));
    Ok(())
}

pub async fn process_recent_command(
    dir: &Path,
    RecentCommand { count }: RecentCommand,
) -> Result<()> {
    let records = LocalDataStore::new(dir.join(DATA_FILE))
        .recent(count)
        .await?;
    if records.is_empty() {
        println!("Nothing was recorded yet.");
    }
    for record in records {
        println!("{}", format_record(&record));
    }
    Ok(())
}

pub fn render_outline(tree: &CategoryTree) -> String {
    let mut outline = String::new();
    push_outline(tree, 0, &mut outline);
    outline
}

fn push_outline(tree: &CategoryTree, depth: usize, outline: &mut String) {
    for (name, child) in tree.children() {
        outline.push_str(&"  ".repeat(depth));
        outline.push_str("- ");
        outline.push_str(name);
        outline.push('\n');
        push_outline(child, depth + 1, outline);
    }
}

fn format_record(record: &RecordedActivity) -> String {
    format!(
        "{}\t{}\t{}",
        format_moment(record.timestamp),
        format_minutes(record.minutes),
        record.activity
    )
}

fn format_minutes(minutes: i64) -> String {
    if minutes >= 60 {
        format!("{}h{}m", minutes / 60, minutes % 60)
    } else {
        format!("{minutes}m")
    }
}

#[cfg(test)]
mod tests {
    use crate::tree::{snapshot::Snapshot, CategoryTree};

    use super::{format_minutes, render_outline};

    #[test]
    fn test_outline_is_indented_by_depth() {
        let snapshot: Snapshot = serde_json::from_str(
            r#"{"Work": {"Meetings": null, "Focus": {"Code": null}}, "Chores": null}"#,
        )
        .unwrap();

        let outline = render_outline(&CategoryTree::from_snapshot(&snapshot));

        assert_eq!(
            outline,
            "- Chores\n- Work\n  - Focus\n    - Code\n  - Meetings\n"
        );
        assert_eq!(render_outline(&CategoryTree::new()), "");
    }

    #[test]
    fn test_format_minutes() {
        assert_eq!(format_minutes(0), "0m");
        assert_eq!(format_minutes(59), "59m");
        assert_eq!(format_minutes(60), "1h0m");
        assert_eq!(format_minutes(135), "2h15m");
    }
}
