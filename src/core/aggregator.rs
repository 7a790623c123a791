// src/core/aggregator.rs

//! # Aggregator
//!
//! Folds the rule sets into a single [`TitleBarData`]. Rule sets are given lowest
//! precedence first and visited highest first; within a set the earlier rule wins.
//! Each output field is locked in by the first matching rule that sets it.
//!
//! The fold only reads resolvers through [`VsState`], so it is safe to recompute on
//! every change notification.

use crate::core::config_loader::RuleSet;
use crate::core::interpolator::Interpolator;
use crate::dev_utils::BlockTimer;
use crate::models::{BlockSetting, InfoBlockData, TitleBarData, TitleBarSetting};
use crate::resolvers::VsState;

/// Computes the title bar. `rule_sets` are ordered lowest precedence first.
pub fn aggregate(rule_sets: &[&RuleSet], state: &VsState<'_>) -> TitleBarData {
    let _timer = BlockTimer::new("aggregate");

    let matched: Vec<&TitleBarSetting> = rule_sets
        .iter()
        .rev()
        .flat_map(|set| set.rules.iter())
        .filter(|rule| state.satisfies_all(rule.predicates.iter()))
        .collect();
    log::trace!("{} rule(s) matched.", matched.len());

    let interpolator = Interpolator::new(state);
    let caption = matched.iter().find_map(|r| r.title_bar_caption.as_deref());

    TitleBarData {
        title: caption.map(|c| interpolator.expand(c)),
        foreground: matched.iter().find_map(|r| r.title_bar_foreground),
        background: matched.iter().find_map(|r| r.title_bar_background),
        search_box: matched.iter().find_map(|r| r.search_box),
        blocks: matched
            .iter()
            .find_map(|r| r.blocks.as_deref())
            .map(|blocks| expand_blocks(blocks, state, &interpolator)),
    }
}

fn expand_blocks(
    blocks: &[BlockSetting],
    state: &VsState<'_>,
    interpolator: &Interpolator<'_, '_>,
) -> Vec<InfoBlockData> {
    blocks
        .iter()
        .filter(|block| state.satisfies_all(block.predicates.iter()))
        .filter_map(|block| {
            let text = interpolator.expand(block.text.as_deref().unwrap_or_default());
            if text.is_empty() {
                return None;
            }
            Some(InfoBlockData {
                text,
                alt_text: block
                    .alt_text
                    .as_deref()
                    .map(|alt| interpolator.expand(alt))
                    .filter(|alt| !alt.is_empty()),
                foreground: block.foreground,
                background: block.background,
            })
        })
        .collect()
}
