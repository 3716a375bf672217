//! Command implementations.

pub mod block;
pub mod config;
pub mod history;
pub mod project;
pub mod search;
pub mod section;

pub use self::block::execute_block;
pub use self::config::execute_config;
pub use self::history::execute_history;
pub use self::project::execute_project;
pub use self::search::{execute_search, run_search};
pub use self::section::execute_section;

use crate::cli::ViewArgs;
use crate::error::Result;
use snippy_domain::{Record, ResultView, SortDirection, SortKey, TierSelector, TierThreshold};
use std::io::{self, Write};

/// Build a view with an optional sort column and a filter.
///
/// Without a sort column rows come in ranked order, which is also the
/// base that ties fall back to when sorting.
pub fn build_view(
    records: &[Record],
    threshold: TierThreshold,
    sort: Option<SortKey>,
    desc: bool,
    filter: TierSelector,
) -> ResultView {
    let mut view = ResultView::ranked(records, threshold);
    if let Some(key) = sort {
        let state = view.sort_by(records, key);
        if desc && state.direction == SortDirection::Ascending {
            view.sort_by(records, key);
        }
    }
    view.set_filter(filter);
    view
}

/// View for commands taking [`ViewArgs`].
pub fn view_from_args(records: &[Record], args: &ViewArgs) -> ResultView {
    build_view(records, args.threshold, args.sort, args.desc, args.filter)
}

/// Ask a yes/no question on stdin; anything but `y` declines.
pub fn confirm(question: &str) -> Result<bool> {
    print!("{} [y/N] ", question);
    io::stdout().flush()?;

    let mut response = String::new();
    io::stdin().read_line(&mut response)?;
    Ok(response.trim().eq_ignore_ascii_case("y"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use snippy_domain::Tier;

    fn record(title: &str, year: Option<i32>, tier: Tier) -> Record {
        Record {
            title: title.to_string(),
            journal: "Journal".to_string(),
            year,
            link: None,
            tier,
            author: None,
        }
    }

    fn titles(view: &ResultView, records: &[Record]) -> Vec<String> {
        view.rows(records).iter().map(|r| r.title.clone()).collect()
    }

    #[test]
    fn test_build_view_sort_and_filter() {
        let records = vec![
            record("b", Some(2001), Tier::Level3),
            record("a", Some(1999), Tier::Level1),
            record("c", None, Tier::Level3),
        ];

        let view = build_view(&records, TierThreshold::Levels23, None, false, TierSelector::All);
        assert_eq!(titles(&view, &records), vec!["b", "c", "a"]);

        let view = build_view(&records, TierThreshold::Levels23, Some(SortKey::Year), false, TierSelector::All);
        assert_eq!(titles(&view, &records), vec!["c", "a", "b"]);

        let view = build_view(&records, TierThreshold::Levels23, Some(SortKey::Year), true, TierSelector::All);
        assert_eq!(titles(&view, &records), vec!["b", "a", "c"]);
        assert_eq!(
            view.sort_state().map(|s| s.direction),
            Some(SortDirection::Descending)
        );

        let view = build_view(
            &records,
            TierThreshold::Levels23,
            Some(SortKey::Title),
            false,
            TierSelector::AnyQualified,
        );
        assert_eq!(titles(&view, &records), vec!["b", "c"]);
    }
}
