use std::collections::BTreeSet;
use std::sync::RwLock;

use mediadeck_protocol::types::{UploadProgress, UploadState};
use tracing::warn;

use crate::TransferError;
use crate::chunked::{Chunk, ChunkPlan};
use crate::progress::percent_complete;

/// One in-flight upload attempt (thread-safe).
///
/// Created when the user submits the upload form, mutated only by the
/// orchestrator, and dropped on completion or failure. The chunk layout is
/// fixed at construction; the set of acknowledged chunks only grows.
pub struct UploadTarget {
    plan: ChunkPlan,
    file_name: String,
    inner: RwLock<TargetInner>,
}

struct TargetInner {
    uploaded_chunks: BTreeSet<u32>,
    current_index: u32,
    state: UploadState,
    percent: u8,
    error: String,
}

impl UploadTarget {
    /// Creates an idle target for `file_name`.
    pub fn new(
        file_name: impl Into<String>,
        total_size: u64,
        chunk_size: u32,
    ) -> Result<Self, TransferError> {
        let file_name = file_name.into();
        crate::validate_file_name(&file_name)?;
        Ok(Self {
            plan: ChunkPlan::new(total_size, chunk_size)?,
            file_name,
            inner: RwLock::new(TargetInner {
                uploaded_chunks: BTreeSet::new(),
                current_index: 0,
                state: UploadState::Idle,
                percent: 0,
                error: String::new(),
            }),
        })
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn total_chunks(&self) -> u32 {
        self.plan.total_chunks()
    }

    /// Byte range of chunk `index`.
    pub fn chunk(&self, index: u32) -> Result<Chunk, TransferError> {
        self.plan.chunk(index)
    }

    /// Merges indices reported by the backend.
    ///
    /// Indices outside the plan are ignored. Returns how many were ignored.
    pub fn merge_uploaded(&self, indices: impl IntoIterator<Item = u32>) -> usize {
        let total = self.total_chunks();
        let mut ignored = 0;
        let mut s = self.write();
        for index in indices {
            if index < total {
                s.uploaded_chunks.insert(index);
            } else {
                ignored += 1;
            }
        }
        if ignored > 0 {
            warn!(
                file_name = %self.file_name,
                ignored,
                total,
                "backend reported chunk indices beyond the plan"
            );
        }
        ignored
    }

    /// Records one acknowledged chunk.
    pub fn mark_uploaded(&self, index: u32) {
        if index < self.total_chunks() {
            self.write().uploaded_chunks.insert(index);
        }
    }

    pub fn is_uploaded(&self, index: u32) -> bool {
        self.read().uploaded_chunks.contains(&index)
    }

    pub fn uploaded_chunks(&self) -> BTreeSet<u32> {
        self.read().uploaded_chunks.clone()
    }

    /// Indices not yet acknowledged, in increasing order.
    pub fn pending_indices(&self) -> Vec<u32> {
        let s = self.read();
        (0..self.total_chunks())
            .filter(|i| !s.uploaded_chunks.contains(i))
            .collect()
    }

    pub fn current_index(&self) -> u32 {
        self.read().current_index
    }

    /// Moves the cursor past `index`. The cursor never moves backwards and
    /// never exceeds `total_chunks`.
    pub fn advance_past(&self, index: u32) {
        let next = index.saturating_add(1).min(self.total_chunks());
        let mut s = self.write();
        if next > s.current_index {
            s.current_index = next;
        }
    }

    pub fn state(&self) -> UploadState {
        self.read().state
    }

    /// Moves to `next` if the transition is legal. Returns whether it moved.
    pub fn set_state(&self, next: UploadState) -> bool {
        let mut s = self.write();
        if s.state.can_transition_to(next) {
            s.state = next;
            true
        } else {
            warn!(
                file_name = %self.file_name,
                from = ?s.state,
                to = ?next,
                "ignoring illegal state transition"
            );
            false
        }
    }

    /// Records progress after chunk `index` succeeded and returns the
    /// percentage to display. The value never decreases within one attempt.
    pub fn report_progress(&self, index: u32) -> u8 {
        let percent = percent_complete(index, self.total_chunks());
        let mut s = self.write();
        if percent > s.percent {
            s.percent = percent;
        }
        s.percent
    }

    pub fn percent(&self) -> u8 {
        self.read().percent
    }

    /// Marks the attempt failed and resets the visible progress to zero.
    pub fn fail(&self, err: &str) {
        self.set_state(UploadState::Failed);
        let mut s = self.write();
        s.percent = 0;
        s.error = err.to_string();
    }

    /// Returns a snapshot for progress displays.
    pub fn progress(&self) -> UploadProgress {
        let s = self.read();
        UploadProgress {
            file_name: self.file_name.clone(),
            state: s.state,
            total_chunks: self.total_chunks(),
            uploaded_chunks: s.uploaded_chunks.len() as u32,
            percent: s.percent,
            error: s.error.clone(),
        }
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, TargetInner> {
        self.inner.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, TargetInner> {
        self.inner.write().unwrap_or_else(|e| e.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn target(total_size: u64, chunk_size: u32) -> UploadTarget {
        UploadTarget::new("1700000000000_clip.mp4", total_size, chunk_size).unwrap()
    }

    #[test]
    fn new_target_is_idle() {
        let t = target(10, 4);
        assert_eq!(t.state(), UploadState::Idle);
        assert_eq!(t.total_chunks(), 3);
        assert_eq!(t.current_index(), 0);
        assert_eq!(t.percent(), 0);
        assert!(t.uploaded_chunks().is_empty());
    }

    #[test]
    fn rejects_bad_file_name() {
        assert!(UploadTarget::new("", 10, 4).is_err());
        assert!(UploadTarget::new("../x.mp4", 10, 4).is_err());
    }

    #[test]
    fn merge_ignores_out_of_range() {
        let t = target(10, 4);
        let ignored = t.merge_uploaded([0, 2, 7]);
        assert_eq!(ignored, 1);
        assert_eq!(t.uploaded_chunks().into_iter().collect::<Vec<_>>(), vec![0, 2]);
        assert_eq!(t.pending_indices(), vec![1]);
    }

    #[test]
    fn uploaded_set_only_grows() {
        let t = target(20, 4);
        t.merge_uploaded([1]);
        t.mark_uploaded(3);
        t.merge_uploaded([]);
        t.mark_uploaded(1);
        assert_eq!(t.uploaded_chunks().into_iter().collect::<Vec<_>>(), vec![1, 3]);
        assert!(t.is_uploaded(3));
        assert!(!t.is_uploaded(0));
    }

    #[test]
    fn cursor_is_monotonic_and_bounded() {
        let t = target(10, 4);
        t.advance_past(1);
        assert_eq!(t.current_index(), 2);
        t.advance_past(0);
        assert_eq!(t.current_index(), 2);
        t.advance_past(10);
        assert_eq!(t.current_index(), 3);
    }

    #[test]
    fn state_machine_rejects_illegal_moves() {
        let t = target(10, 4);
        assert!(!t.set_state(UploadState::Uploading));
        assert!(t.set_state(UploadState::Probing));
        assert!(t.set_state(UploadState::Uploading));
        assert!(t.set_state(UploadState::Finalizing));
        assert!(t.set_state(UploadState::Complete));
        assert!(!t.set_state(UploadState::Failed));
        assert_eq!(t.state(), UploadState::Complete);
    }

    #[test]
    fn progress_never_decreases() {
        let t = target(50, 10);
        assert_eq!(t.report_progress(2), 60);
        // A late report for an earlier index keeps the higher value.
        assert_eq!(t.report_progress(0), 60);
        assert_eq!(t.report_progress(4), 100);
    }

    #[test]
    fn fail_resets_progress() {
        let t = target(50, 10);
        t.set_state(UploadState::Probing);
        t.set_state(UploadState::Uploading);
        t.report_progress(1);
        t.fail("network down");

        let p = t.progress();
        assert_eq!(p.state, UploadState::Failed);
        assert_eq!(p.percent, 0);
        assert_eq!(p.error, "network down");
    }

    #[test]
    fn concurrent_access() {
        use std::sync::Arc;
        use std::thread;

        let t = Arc::new(target(1000, 1));
        let mut handles = vec![];

        for i in 0..10u32 {
            let t = Arc::clone(&t);
            handles.push(thread::spawn(move || {
                for j in 0..100u32 {
                    t.mark_uploaded(i * 100 + j);
                    t.report_progress(i * 100 + j);
                }
            }));
        }
        for _ in 0..10 {
            let t = Arc::clone(&t);
            handles.push(thread::spawn(move || {
                for _ in 0..100 {
                    let _ = t.progress();
                }
            }));
        }
        for h in handles {
            h.join().unwrap();
        }

        assert_eq!(t.uploaded_chunks().len(), 1000);
        assert_eq!(t.percent(), 100);
    }
}
