//! Archive - saved searches and the project hierarchy over a `SearchStore`

use crate::progress::RunOutcome;
use crate::SearchError;
use snippy_domain::{
    DedupKey, EntityId, Project, ProjectDetail, SavedSearch, SearchStore, SearchSummary,
    TierThreshold,
};
use std::fmt::Display;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::{debug, info};

/// Current timestamp in seconds since Unix epoch
pub fn current_timestamp() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default()
}

fn store_err<E: Display>(e: E) -> SearchError {
    SearchError::Store(e.to_string())
}

/// Front for persistence operations, mapping store errors and misses
pub struct Archive<S> {
    store: S,
}

impl<S> Archive<S>
where
    S: SearchStore,
    S::Error: Display,
{
    /// Wrap a store
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Borrow the underlying store
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Unwrap into the underlying store
    pub fn into_inner(self) -> S {
        self.store
    }

    /// Save a finished run as a saved search
    ///
    /// Runs that are not terminal or found nothing are skipped; returns
    /// whether a snapshot was written.
    pub fn save_outcome(&mut self, outcome: &RunOutcome) -> Result<bool, SearchError> {
        if !outcome.is_saveable() {
            debug!(status = %outcome.status(), "Outcome not saved");
            return Ok(false);
        }
        let search = outcome.to_saved_search(current_timestamp());
        self.store.save_search(&search).map_err(store_err)?;
        info!(
            keywords = %search.keywords,
            records = search.records.len(),
            "Saved search snapshot"
        );
        Ok(true)
    }

    /// Saved searches, newest first
    pub fn list_searches(&self) -> Result<Vec<SearchSummary>, SearchError> {
        self.store.list_searches().map_err(store_err)
    }

    /// A saved search by keywords
    pub fn get_search(&self, keywords: &str) -> Result<SavedSearch, SearchError> {
        self.store
            .get_search(keywords)
            .map_err(store_err)?
            .ok_or_else(|| SearchError::NotFound(format!("saved search '{}'", keywords)))
    }

    /// Delete a saved search
    pub fn delete_search(&mut self, keywords: &str) -> Result<(), SearchError> {
        if !self.store.delete_search(keywords).map_err(store_err)? {
            return Err(SearchError::NotFound(format!("saved search '{}'", keywords)));
        }
        info!(keywords, "Deleted saved search");
        Ok(())
    }

    /// Delete one record of a saved search
    pub fn delete_record(&mut self, keywords: &str, key: &DedupKey) -> Result<(), SearchError> {
        if !self.store.delete_record(keywords, key).map_err(store_err)? {
            return Err(SearchError::NotFound(format!(
                "record '{}' in saved search '{}'",
                key, keywords
            )));
        }
        Ok(())
    }

    /// Delete records of a saved search that do not meet `threshold`
    pub fn prune(&mut self, keywords: &str, threshold: TierThreshold) -> Result<usize, SearchError> {
        // Surface a miss instead of reporting zero deletions
        self.get_search(keywords)?;
        let removed = self
            .store
            .prune_unqualified(keywords, threshold)
            .map_err(store_err)?;
        info!(keywords, removed, threshold = %threshold, "Pruned saved search");
        Ok(removed)
    }

    /// Create a project
    pub fn create_project(&mut self, title: &str, description: &str) -> Result<EntityId, SearchError> {
        if title.trim().is_empty() {
            return Err(SearchError::InvalidInput("project title must not be empty".to_string()));
        }
        self.store
            .create_project(title.trim(), description.trim())
            .map_err(store_err)
    }

    /// Projects in creation order
    pub fn list_projects(&self) -> Result<Vec<Project>, SearchError> {
        self.store.list_projects().map_err(store_err)
    }

    /// A project with its sections and blocks
    pub fn get_project(&self, id: EntityId) -> Result<ProjectDetail, SearchError> {
        self.store
            .get_project(id)
            .map_err(store_err)?
            .ok_or_else(|| SearchError::NotFound(format!("project {}", id)))
    }

    /// Delete a project with everything under it
    pub fn delete_project(&mut self, id: EntityId) -> Result<(), SearchError> {
        if !self.store.delete_project(id).map_err(store_err)? {
            return Err(SearchError::NotFound(format!("project {}", id)));
        }
        Ok(())
    }

    /// Add a section to a project
    pub fn add_section(&mut self, project_id: EntityId, title: &str) -> Result<EntityId, SearchError> {
        if title.trim().is_empty() {
            return Err(SearchError::InvalidInput("section title must not be empty".to_string()));
        }
        self.get_project(project_id)?;
        self.store
            .add_section(project_id, title.trim())
            .map_err(store_err)
    }

    /// Delete a section with its blocks
    pub fn delete_section(&mut self, section_id: EntityId) -> Result<(), SearchError> {
        if !self.store.delete_section(section_id).map_err(store_err)? {
            return Err(SearchError::NotFound(format!("section {}", section_id)));
        }
        Ok(())
    }

    /// Copy a saved search into a section
    pub fn add_search_block(
        &mut self,
        section_id: EntityId,
        keywords: &str,
    ) -> Result<EntityId, SearchError> {
        self.get_search(keywords)?;
        self.store
            .add_search_block(section_id, keywords)
            .map_err(store_err)
    }

    /// Delete a search block
    pub fn delete_search_block(&mut self, block_id: EntityId) -> Result<(), SearchError> {
        if !self.store.delete_search_block(block_id).map_err(store_err)? {
            return Err(SearchError::NotFound(format!("search block {}", block_id)));
        }
        Ok(())
    }

    /// Delete the record at `index` of a search block
    pub fn delete_block_record(&mut self, block_id: EntityId, index: usize) -> Result<(), SearchError> {
        if !self
            .store
            .delete_block_record(block_id, index)
            .map_err(store_err)?
        {
            return Err(SearchError::NotFound(format!(
                "record {} in search block {}",
                index, block_id
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::{RunState, RunStatus};
    use snippy_domain::{Query, Record, SearchBlock, Section, SectionDetail, Tier};

    // In-memory store for testing
    #[derive(Default)]
    struct MockStore {
        searches: Vec<SavedSearch>,
        projects: Vec<ProjectDetail>,
        fail: bool,
    }

    impl MockStore {
        fn section_mut(&mut self, id: EntityId) -> Option<&mut SectionDetail> {
            self.projects
                .iter_mut()
                .flat_map(|p| p.sections.iter_mut())
                .find(|s| s.section.id == id)
        }

        fn block_mut(&mut self, id: EntityId) -> Option<&mut SearchBlock> {
            self.projects
                .iter_mut()
                .flat_map(|p| p.sections.iter_mut())
                .flat_map(|s| s.blocks.iter_mut())
                .find(|b| b.id == id)
        }
    }

    impl SearchStore for MockStore {
        type Error = String;

        fn save_search(&mut self, search: &SavedSearch) -> Result<(), Self::Error> {
            if self.fail {
                return Err("disk full".to_string());
            }
            self.searches.retain(|s| s.keywords != search.keywords);
            self.searches.push(search.clone());
            Ok(())
        }

        fn get_search(&self, keywords: &str) -> Result<Option<SavedSearch>, Self::Error> {
            Ok(self.searches.iter().find(|s| s.keywords == keywords).cloned())
        }

        fn list_searches(&self) -> Result<Vec<SearchSummary>, Self::Error> {
            Ok(self
                .searches
                .iter()
                .rev()
                .map(|s| SearchSummary {
                    keywords: s.keywords.clone(),
                    saved_at: s.saved_at,
                    count: s.records.len(),
                })
                .collect())
        }

        fn delete_search(&mut self, keywords: &str) -> Result<bool, Self::Error> {
            let before = self.searches.len();
            self.searches.retain(|s| s.keywords != keywords);
            Ok(self.searches.len() != before)
        }

        fn delete_record(&mut self, keywords: &str, key: &DedupKey) -> Result<bool, Self::Error> {
            let Some(search) = self.searches.iter_mut().find(|s| s.keywords == keywords) else {
                return Ok(false);
            };
            let before = search.records.len();
            search.records.retain(|r| &r.dedup_key() != key);
            Ok(search.records.len() != before)
        }

        fn prune_unqualified(
            &mut self,
            keywords: &str,
            threshold: TierThreshold,
        ) -> Result<usize, Self::Error> {
            let Some(search) = self.searches.iter_mut().find(|s| s.keywords == keywords) else {
                return Ok(0);
            };
            let before = search.records.len();
            search.records.retain(|r| threshold.qualifies(r.tier));
            Ok(before - search.records.len())
        }

        fn create_project(&mut self, title: &str, description: &str) -> Result<EntityId, Self::Error> {
            let id = EntityId::new();
            self.projects.push(ProjectDetail {
                project: Project {
                    id,
                    title: title.to_string(),
                    description: description.to_string(),
                    created_at: 0,
                },
                sections: Vec::new(),
            });
            Ok(id)
        }

        fn list_projects(&self) -> Result<Vec<Project>, Self::Error> {
            Ok(self.projects.iter().map(|p| p.project.clone()).collect())
        }

        fn get_project(&self, id: EntityId) -> Result<Option<ProjectDetail>, Self::Error> {
            Ok(self.projects.iter().find(|p| p.project.id == id).cloned())
        }

        fn delete_project(&mut self, id: EntityId) -> Result<bool, Self::Error> {
            let before = self.projects.len();
            self.projects.retain(|p| p.project.id != id);
            Ok(self.projects.len() != before)
        }

        fn add_section(&mut self, project_id: EntityId, title: &str) -> Result<EntityId, Self::Error> {
            let id = EntityId::new();
            let project = self
                .projects
                .iter_mut()
                .find(|p| p.project.id == project_id)
                .ok_or("no project")?;
            project.sections.push(SectionDetail {
                section: Section {
                    id,
                    project_id,
                    title: title.to_string(),
                    created_at: 0,
                },
                blocks: Vec::new(),
            });
            Ok(id)
        }

        fn delete_section(&mut self, section_id: EntityId) -> Result<bool, Self::Error> {
            let mut removed = false;
            for project in &mut self.projects {
                let before = project.sections.len();
                project.sections.retain(|s| s.section.id != section_id);
                removed |= project.sections.len() != before;
            }
            Ok(removed)
        }

        fn add_search_block(&mut self, section_id: EntityId, keywords: &str) -> Result<EntityId, Self::Error> {
            let records = self
                .searches
                .iter()
                .find(|s| s.keywords == keywords)
                .map(|s| s.records.clone())
                .ok_or("no search")?;
            let id = EntityId::new();
            let section = self.section_mut(section_id).ok_or("no section")?;
            section.blocks.push(SearchBlock {
                id,
                section_id,
                keywords: keywords.to_string(),
                added_at: 0,
                records,
            });
            Ok(id)
        }

        fn delete_search_block(&mut self, block_id: EntityId) -> Result<bool, Self::Error> {
            let mut removed = false;
            for project in &mut self.projects {
                for section in &mut project.sections {
                    let before = section.blocks.len();
                    section.blocks.retain(|b| b.id != block_id);
                    removed |= section.blocks.len() != before;
                }
            }
            Ok(removed)
        }

        fn delete_block_record(&mut self, block_id: EntityId, index: usize) -> Result<bool, Self::Error> {
            match self.block_mut(block_id) {
                Some(block) if index < block.records.len() => {
                    block.records.remove(index);
                    Ok(true)
                }
                _ => Ok(false),
            }
        }
    }

    fn record(title: &str, tier: Tier) -> Record {
        Record {
            title: title.to_string(),
            journal: "J".to_string(),
            year: Some(2020),
            link: None,
            tier,
            author: None,
        }
    }

    fn outcome(status: RunStatus, records: Vec<Record>) -> RunOutcome {
        RunOutcome {
            query: Query::new("graph theory", 10).unwrap(),
            state: RunState {
                status,
                cumulative_count: records.len(),
                ..RunState::default()
            },
            records,
        }
    }

    #[test]
    fn test_save_outcome_only_when_terminal_and_non_empty() {
        let mut archive = Archive::new(MockStore::default());
        assert!(!archive.save_outcome(&outcome(RunStatus::Completed, Vec::new())).unwrap());
        assert!(archive
            .save_outcome(&outcome(RunStatus::Failed, vec![record("a", Tier::Level2)]))
            .unwrap());

        let saved = archive.get_search("graph theory").unwrap();
        assert_eq!(saved.records.len(), 1);
        assert!(saved.saved_at > 0);
    }

    #[test]
    fn test_save_replaces_by_keywords() {
        let mut archive = Archive::new(MockStore::default());
        archive
            .save_outcome(&outcome(RunStatus::Completed, vec![record("a", Tier::Level2)]))
            .unwrap();
        archive
            .save_outcome(&outcome(
                RunStatus::Completed,
                vec![record("b", Tier::Level3), record("c", Tier::Level1)],
            ))
            .unwrap();
        let list = archive.list_searches().unwrap();
        assert_eq!(list.len(), 1);
        assert_eq!(list[0].count, 2);
    }

    #[test]
    fn test_store_errors_are_mapped() {
        let mut archive = Archive::new(MockStore {
            fail: true,
            ..MockStore::default()
        });
        let err = archive
            .save_outcome(&outcome(RunStatus::Completed, vec![record("a", Tier::Level2)]))
            .unwrap_err();
        assert!(matches!(err, SearchError::Store(msg) if msg == "disk full"));
    }

    #[test]
    fn test_record_deletes_and_prune() {
        let mut archive = Archive::new(MockStore::default());
        archive
            .save_outcome(&outcome(
                RunStatus::Completed,
                vec![
                    record("a", Tier::Level3),
                    record("b", Tier::Level1),
                    record("c", Tier::Unranked),
                ],
            ))
            .unwrap();

        let key = record("a", Tier::Level3).dedup_key();
        archive.delete_record("graph theory", &key).unwrap();
        assert!(matches!(
            archive.delete_record("graph theory", &key),
            Err(SearchError::NotFound(_))
        ));

        assert_eq!(archive.prune("graph theory", TierThreshold::Levels123).unwrap(), 1);
        assert!(matches!(
            archive.prune("missing", TierThreshold::Levels123),
            Err(SearchError::NotFound(_))
        ));

        archive.delete_search("graph theory").unwrap();
        assert!(matches!(
            archive.delete_search("graph theory"),
            Err(SearchError::NotFound(_))
        ));
    }

    #[test]
    fn test_project_hierarchy() {
        let mut archive = Archive::new(MockStore::default());
        archive
            .save_outcome(&outcome(
                RunStatus::Completed,
                vec![record("a", Tier::Level3), record("b", Tier::Level2)],
            ))
            .unwrap();

        assert!(matches!(
            archive.create_project("  ", "x"),
            Err(SearchError::InvalidInput(_))
        ));
        let project = archive.create_project("Thesis", "Chapter sources").unwrap();
        assert!(matches!(
            archive.add_section(project, ""),
            Err(SearchError::InvalidInput(_))
        ));
        let section = archive.add_section(project, "Background").unwrap();
        assert!(matches!(
            archive.add_search_block(section, "missing"),
            Err(SearchError::NotFound(_))
        ));
        let block = archive.add_search_block(section, "graph theory").unwrap();

        archive.delete_block_record(block, 0).unwrap();
        assert!(archive.delete_block_record(block, 5).is_err());

        let detail = archive.get_project(project).unwrap();
        assert_eq!(detail.sections[0].blocks[0].records.len(), 1);
        assert_eq!(detail.sections[0].blocks[0].records[0].title, "b");

        // Blocks are snapshots; the saved search is untouched
        assert_eq!(archive.get_search("graph theory").unwrap().records.len(), 2);

        archive.delete_search_block(block).unwrap();
        archive.delete_section(section).unwrap();
        archive.delete_project(project).unwrap();
        assert!(archive.list_projects().unwrap().is_empty());
        assert!(archive.get_project(project).is_err());
    }
}
