// src/cli/handlers/tags.rs

use crate::{
    CancellationToken,
    cli::{args::TagsArgs, handlers::commons},
    resolvers::VsState,
};
use anyhow::Result;
use clap::Parser;
use colored::*;

/// One row of the `tags` listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagRow {
    /// The base identifier.
    pub tag: &'static str,
    /// Name of the resolver owning the tag.
    pub owner: &'static str,
    /// `None` when the tag is currently not resolvable.
    pub value: Option<String>,
}

/// Collects every tag of every resolver, in resolver order.
pub fn collect_rows(state: &VsState<'_>) -> Vec<TagRow> {
    state
        .resolvers
        .iter()
        .flat_map(|resolver| {
            resolver.tags().iter().map(move |&tag| TagRow {
                tag,
                owner: resolver.name(),
                value: resolver
                    .resolvable(state, tag)
                    .then(|| resolver.resolve(state, tag)),
            })
        })
        .collect()
}

/// The main handler for the `tags` command.
pub fn handle(args: Vec<String>, _cancellation_token: &CancellationToken) -> Result<()> {
    let tags_args = TagsArgs::try_parse_from(&args)?;
    let runtime = commons::build_runtime()?;
    let session = commons::open_session(&runtime, &tags_args.session, tags_args.solution.as_deref())?;

    let rows = session.with_state(collect_rows);

    println!(
        "\n  {:<26} {:<10} {}",
        "TAG".bold(),
        "OWNER".bold(),
        "VALUE".bold()
    );
    for row in rows {
        let value = match row.value {
            Some(v) if v.is_empty() => "\"\"".dimmed().to_string(),
            Some(v) => v.green().to_string(),
            None => "unresolvable".dimmed().to_string(),
        };
        println!("  {:<26} {:<10} {}", row.tag.cyan(), row.owner, value);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::DebugMode;
    use crate::resolvers::testing::StubResolver;
    use crate::resolvers::{Resolver, ResolverSet};
    use std::sync::Arc;

    #[test]
    fn test_collect_rows_marks_unresolvable_tags() {
        // --- Setup ---
        let set = ResolverSet::new(vec![
            Arc::new(StubResolver::new("git", &["git", "git-branch"]).with("git-branch", "main"))
                as Arc<dyn Resolver>,
            Arc::new(StubResolver::new("svn", &["svn"]).unavailable()),
        ])
        .unwrap();
        let state = set.state(DebugMode::Design, None);

        // --- Execute ---
        let rows = collect_rows(&state);

        // --- Assert ---
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].value.as_deref(), Some(""));
        assert_eq!(rows[1].tag, "git-branch");
        assert_eq!(rows[1].value.as_deref(), Some("main"));
        assert_eq!(rows[2].owner, "svn");
        assert_eq!(rows[2].value, None);
    }
}
