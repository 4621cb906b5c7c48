//! Content-addressed reconciliation between a local and a remote snapshot
//!
//! Produces the ordered list of remote operations that makes the remote hold
//! exactly the local content, reusing anything already on the remote by copy
//! or move instead of uploading it again.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;
use std::ops::Bound;

use serde::{Deserialize, Serialize};

use crate::hash::ContentHash;
use crate::path::RelPath;
use crate::snapshot::Snapshot;

/// One operation against the remote directory
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SyncAction {
    /// Send the local file's bytes
    Upload(RelPath),
    /// Duplicate a remote file that must also stay where it is
    CopyRename { src: RelPath, dst: RelPath },
    /// Rename a stale remote file into the place where its content is needed
    MoveRename { src: RelPath, dst: RelPath },
    /// Remove a remote file that no longer exists locally
    Delete(RelPath),
}

impl SyncAction {
    /// Remote path this action reads from, if any
    #[must_use]
    pub fn source(&self) -> Option<&RelPath> {
        match self {
            Self::CopyRename { src, .. } | Self::MoveRename { src, .. } => Some(src),
            Self::Upload(_) | Self::Delete(_) => None,
        }
    }

    /// Remote path this action creates, overwrites or removes
    #[must_use]
    pub fn target(&self) -> &RelPath {
        match self {
            Self::Upload(path) | Self::Delete(path) => path,
            Self::CopyRename { dst, .. } | Self::MoveRename { dst, .. } => dst,
        }
    }
}

impl fmt::Display for SyncAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Upload(path) => write!(f, "upload {path}"),
            Self::CopyRename { src, dst } => write!(f, "copy {src} -> {dst}"),
            Self::MoveRename { src, dst } => write!(f, "move {src} -> {dst}"),
            Self::Delete(path) => write!(f, "delete {path}"),
        }
    }
}

/// Ordered remote operations for one sync pass
///
/// `cleanup` must only run after every `transfers` entry succeeded: a remote
/// file may be the source of a pending copy or move.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Plan {
    /// Uploads, copies and moves in execution order
    pub transfers: Vec<SyncAction>,
    /// Deletes of remote-only files
    pub cleanup: Vec<SyncAction>,
}

impl Plan {
    /// Nothing to do
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.transfers.is_empty() && self.cleanup.is_empty()
    }

    /// Total number of actions
    #[must_use]
    pub fn len(&self) -> usize {
        self.transfers.len() + self.cleanup.len()
    }

    /// All actions, transfers first
    pub fn actions(&self) -> impl Iterator<Item = &SyncAction> {
        self.transfers.iter().chain(&self.cleanup)
    }

    /// Number of uploads, the only actions that move file bytes
    #[must_use]
    pub fn upload_count(&self) -> usize {
        self.transfers
            .iter()
            .filter(|a| matches!(a, SyncAction::Upload(_)))
            .count()
    }
}

/// Directory that holds content moved out of the way to break a cycle of
/// overwrites (two files swapping contents, for example)
///
/// If a file of this name exists on either side, `.dropsync-stash.1`,
/// `.dropsync-stash.2` and so on are tried instead.
pub const STASH_DIR: &str = ".dropsync-stash";

/// The remote as it will look after the actions emitted so far
///
/// Keeps a fingerprint index so each lookup is O(1) on average, and the
/// sources it hands out are always still present on the remote at the point
/// the action will execute.
struct ProjectedRemote {
    by_path: BTreeMap<RelPath, ContentHash>,
    by_hash: HashMap<ContentHash, BTreeSet<RelPath>>,
}

impl ProjectedRemote {
    fn new(remote: &Snapshot) -> Self {
        let mut by_hash: HashMap<ContentHash, BTreeSet<RelPath>> = HashMap::new();
        for (path, hash) in remote {
            by_hash.entry(*hash).or_default().insert(path.clone());
        }
        let by_path = remote.iter().map(|(p, h)| (p.clone(), *h)).collect();
        Self { by_path, by_hash }
    }

    fn get(&self, path: &RelPath) -> Option<&ContentHash> {
        self.by_path.get(path)
    }

    /// Lexicographically smallest path holding `hash`
    fn first_with(&self, hash: &ContentHash) -> Option<&RelPath> {
        self.by_hash.get(hash).and_then(|paths| paths.first())
    }

    /// Files inside the directory `dir`, at any depth
    fn below(&self, dir: &RelPath) -> Vec<RelPath> {
        let prefix = format!("{dir}/");
        self.by_path
            .range::<str, _>((Bound::Included(prefix.as_str()), Bound::Unbounded))
            .take_while(|(path, _)| path.as_str().starts_with(&prefix))
            .map(|(path, _)| path.clone())
            .collect()
    }

    fn holders(&self, hash: &ContentHash) -> usize {
        self.by_hash.get(hash).map_or(0, BTreeSet::len)
    }

    fn set(&mut self, path: &RelPath, hash: ContentHash) {
        self.remove(path);
        self.by_path.insert(path.clone(), hash);
        self.by_hash.entry(hash).or_default().insert(path.clone());
    }

    fn remove(&mut self, path: &RelPath) {
        if let Some(old) = self.by_path.remove(path)
            && let Some(paths) = self.by_hash.get_mut(&old)
        {
            paths.remove(path);
            if paths.is_empty() {
                self.by_hash.remove(&old);
            }
        }
    }
}

struct Planner<'a> {
    local: &'a Snapshot,
    local_by_hash: HashMap<ContentHash, Vec<&'a RelPath>>,
    projected: ProjectedRemote,
    done: BTreeSet<&'a RelPath>,
    in_progress: BTreeSet<&'a RelPath>,
    stash_dir: String,
    transfers: Vec<SyncAction>,
}

impl<'a> Planner<'a> {
    fn new(local: &'a Snapshot, remote: &Snapshot) -> Self {
        let mut local_by_hash: HashMap<ContentHash, Vec<&'a RelPath>> = HashMap::new();
        for (path, hash) in local {
            local_by_hash.entry(*hash).or_default().push(path);
        }
        Self {
            local,
            local_by_hash,
            projected: ProjectedRemote::new(remote),
            done: BTreeSet::new(),
            in_progress: BTreeSet::new(),
            stash_dir: stash_dir(local, remote),
            transfers: Vec::new(),
        }
    }

    fn is_satisfied(&self, path: &RelPath) -> bool {
        self.projected.get(path) == self.local.get(path)
    }

    /// Claim `path` for work. False when it is already handled or in
    /// progress further down the stack.
    fn begin(&mut self, path: &'a RelPath) -> bool {
        if self.done.contains(path) || self.in_progress.contains(path) {
            return false;
        }
        if self.is_satisfied(path) {
            self.done.insert(path);
            return false;
        }
        self.in_progress.insert(path);
        true
    }

    /// Emit whatever `path` needs, after first rescuing content it would
    /// overwrite that some other local path still needs.
    ///
    /// Rescuing can chain through any number of paths (a renumbered series
    /// of files), so pending paths live on an explicit stack. A path is
    /// finished once nothing it would overwrite is still needed elsewhere.
    fn satisfy(&mut self, path: &'a RelPath, hash: ContentHash) {
        if !self.begin(path) {
            return;
        }
        let mut pending = vec![(path, hash)];
        while let Some(&(path, hash)) = pending.last() {
            if let Some((next, content)) = self.evict(path) {
                if self.begin(next) {
                    pending.push((next, content));
                }
                continue;
            }
            pending.pop();
            self.clear_way(path);
            self.emit(path, hash);
        }
    }

    fn emit(&mut self, path: &'a RelPath, hash: ContentHash) {
        let action = match self.projected.first_with(&hash).cloned() {
            Some(src) if self.local.get(&src) == Some(&hash) => SyncAction::CopyRename {
                src,
                dst: path.clone(),
            },
            Some(src) => {
                self.projected.remove(&src);
                SyncAction::MoveRename {
                    src,
                    dst: path.clone(),
                }
            }
            None => SyncAction::Upload(path.clone()),
        };

        self.projected.set(path, hash);
        self.transfers.push(action);
        self.in_progress.remove(path);
        self.done.insert(path);
    }

    /// Make sure the remote content currently at `path` survives being
    /// overwritten if a pending local path still needs it.
    ///
    /// Returns the local path that has to be satisfied first, which takes the
    /// content somewhere safe. `None` means `path` can be overwritten now.
    fn evict(&mut self, path: &'a RelPath) -> Option<(&'a RelPath, ContentHash)> {
        let current = self.projected.get(path).copied()?;
        if self.projected.holders(&current) > 1 {
            return None;
        }

        let waiting: Vec<&'a RelPath> = self
            .local_by_hash
            .get(&current)
            .into_iter()
            .flatten()
            .copied()
            .filter(|p| *p != path && !self.done.contains(p) && !self.is_satisfied(p))
            .collect();

        if let Some(&next) = waiting.iter().find(|p| !self.in_progress.contains(**p)) {
            return Some((next, current));
        }
        if !waiting.is_empty() {
            // Every reader is already pending below us: park the content.
            let stash = self.stash_path(&current);
            self.projected.remove(path);
            self.projected.set(&stash, current);
            self.transfers.push(SyncAction::MoveRename {
                src: path.clone(),
                dst: stash,
            });
        }
        None
    }

    /// Park remote files that would stop `path` from being created: a file
    /// where one of its parent directories has to be, or files inside a
    /// directory standing where `path` has to be. None of them can exist
    /// locally, so they are stashed and later cleaned up unless reused.
    fn clear_way(&mut self, path: &RelPath) {
        let mut blockers = Vec::new();
        let mut ancestor = path.parent();
        while let Some(dir) = ancestor {
            if self.projected.get(&dir).is_some() {
                blockers.push(dir.clone());
            }
            ancestor = dir.parent();
        }
        blockers.extend(self.projected.below(path));

        for blocker in blockers {
            let Some(hash) = self.projected.get(&blocker).copied() else {
                continue;
            };
            let stash = self.stash_path(&hash);
            self.projected.remove(&blocker);
            self.projected.set(&stash, hash);
            self.transfers.push(SyncAction::MoveRename {
                src: blocker,
                dst: stash,
            });
        }
    }

    fn stash_path(&self, hash: &ContentHash) -> RelPath {
        let hex = hash.to_hex();
        let mut n = 0u32;
        loop {
            let name = if n == 0 {
                format!("{}/{hex}", self.stash_dir)
            } else {
                format!("{}/{hex}.{n}", self.stash_dir)
            };
            if let Ok(candidate) = RelPath::new(&name)
                && !self.local.contains(&candidate)
                && self.projected.get(&candidate).is_none()
            {
                return candidate;
            }
            n += 1;
        }
    }
}

/// First stash directory name that is not a file on either side
fn stash_dir(local: &Snapshot, remote: &Snapshot) -> String {
    let mut n = 0u32;
    loop {
        let name = if n == 0 {
            STASH_DIR.to_string()
        } else {
            format!("{STASH_DIR}.{n}")
        };
        let taken = RelPath::new(&name).is_ok_and(|p| local.contains(&p) || remote.contains(&p));
        if !taken {
            return name;
        }
        n += 1;
    }
}

/// Compute the actions that make `remote` content-equal to `local`.
///
/// Local paths are visited in lexicographic order. A path whose remote copy
/// already matches needs nothing. Otherwise, if the remote holds the same
/// content anywhere (smallest such path wins), that file is copied when it is
/// itself an unchanged local file and moved when it is not. Only content the
/// remote lacks entirely is uploaded. Remote paths missing locally end up in
/// [`Plan::cleanup`].
///
/// Before a remote file is overwritten, any other local path that needs its
/// content is handled first, so content present on the remote is never lost
/// and re-uploaded. Cycles (files swapping contents) park one file under
/// [`STASH_DIR`] and move it out again.
#[must_use]
pub fn plan(local: &Snapshot, remote: &Snapshot) -> Plan {
    let mut planner = Planner::new(local, remote);
    for (path, hash) in local {
        planner.satisfy(path, *hash);
    }

    let cleanup = planner
        .projected
        .by_path
        .keys()
        .filter(|path| !local.contains(path))
        .map(|path| SyncAction::Delete(path.clone()))
        .collect();

    Plan {
        transfers: planner.transfers,
        cleanup,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rel(p: &str) -> RelPath {
        RelPath::new(p).unwrap()
    }

    fn snap(files: &[(&str, &str)]) -> Snapshot {
        Snapshot::from_entries(
            files
                .iter()
                .map(|(p, c)| (rel(p), ContentHash::from_bytes(c.as_bytes()))),
        )
    }

    fn mv(src: &str, dst: &str) -> SyncAction {
        SyncAction::MoveRename {
            src: rel(src),
            dst: rel(dst),
        }
    }

    fn cp(src: &str, dst: &str) -> SyncAction {
        SyncAction::CopyRename {
            src: rel(src),
            dst: rel(dst),
        }
    }

    /// Apply a plan to a snapshot the way a well-behaved server would,
    /// reading upload content from `local`.
    fn apply(remote: &Snapshot, plan: &Plan, local: &Snapshot) -> Snapshot {
        let mut files: BTreeMap<RelPath, ContentHash> =
            remote.iter().map(|(p, h)| (p.clone(), *h)).collect();
        for action in plan.actions() {
            match action {
                SyncAction::Upload(path) => {
                    files.insert(path.clone(), *local.get(path).unwrap());
                }
                SyncAction::CopyRename { src, dst } => {
                    let hash = *files.get(src).expect("copy source must exist");
                    files.insert(dst.clone(), hash);
                }
                SyncAction::MoveRename { src, dst } => {
                    let hash = files.remove(src).expect("move source must exist");
                    files.insert(dst.clone(), hash);
                }
                SyncAction::Delete(path) => {
                    files.remove(path);
                }
            }
        }
        Snapshot::from_entries(files)
    }

    #[test]
    fn scenario_a_upload_to_empty_remote() {
        let local = snap(&[("a.txt", "H1")]);
        let p = plan(&local, &Snapshot::empty());
        assert_eq!(p.transfers, vec![SyncAction::Upload(rel("a.txt"))]);
        assert!(p.cleanup.is_empty());
    }

    #[test]
    fn scenario_b_move_stale_remote_file() {
        let local = snap(&[("a.txt", "H1")]);
        let remote = snap(&[("b.txt", "H1")]);
        let p = plan(&local, &remote);
        assert_eq!(p.transfers, vec![mv("b.txt", "a.txt")]);
        assert!(p.cleanup.is_empty(), "moved source must not be deleted again");
    }

    #[test]
    fn scenario_c_copy_live_sibling() {
        let local = snap(&[("a.txt", "H1"), ("b.txt", "H1")]);
        let remote = snap(&[("b.txt", "H1")]);
        let p = plan(&local, &remote);
        assert_eq!(p.transfers, vec![cp("b.txt", "a.txt")]);
        assert!(p.cleanup.is_empty());
    }

    #[test]
    fn scenario_d_cleanup_only() {
        let local = snap(&[("a.txt", "H1")]);
        let remote = snap(&[("a.txt", "H1"), ("old.txt", "H9")]);
        let p = plan(&local, &remote);
        assert!(p.transfers.is_empty());
        assert_eq!(p.cleanup, vec![SyncAction::Delete(rel("old.txt"))]);
    }

    #[test]
    fn scenario_e_rename_is_a_move() {
        let before = snap(&[("docs/report.txt", "R"), ("keep.txt", "K")]);
        let after = snap(&[("docs/final.txt", "R"), ("keep.txt", "K")]);
        let p = plan(&after, &before);
        assert_eq!(p.transfers, vec![mv("docs/report.txt", "docs/final.txt")]);
        assert!(p.cleanup.is_empty());
        assert_eq!(p.upload_count(), 0);
    }

    #[test]
    fn test_smallest_source_wins() {
        let local = snap(&[("new.txt", "X")]);
        let remote = snap(&[("z.txt", "X"), ("m.txt", "X"), ("c.txt", "X")]);
        let p = plan(&local, &remote);
        assert_eq!(p.transfers, vec![mv("c.txt", "new.txt")]);
        assert_eq!(
            p.cleanup,
            vec![SyncAction::Delete(rel("m.txt")), SyncAction::Delete(rel("z.txt"))]
        );
    }

    #[test]
    fn test_moved_source_is_not_reused() {
        // The first new name takes the stale file, the second copies from it.
        let local = snap(&[("a.txt", "X"), ("b.txt", "X")]);
        let remote = snap(&[("old.txt", "X")]);
        let p = plan(&local, &remote);
        assert_eq!(p.transfers, vec![mv("old.txt", "a.txt"), cp("a.txt", "b.txt")]);
        assert!(p.cleanup.is_empty());
        assert_eq!(apply(&remote, &p, &local), local);
    }

    #[test]
    fn test_uploaded_content_is_copied_not_resent() {
        let local = snap(&[("a.txt", "same"), ("b.txt", "same"), ("c.txt", "same")]);
        let p = plan(&local, &Snapshot::empty());
        assert_eq!(
            p.transfers,
            vec![
                SyncAction::Upload(rel("a.txt")),
                cp("a.txt", "b.txt"),
                cp("a.txt", "c.txt"),
            ]
        );
    }

    #[test]
    fn test_overwrite_rescues_needed_content() {
        // a.txt on the remote holds what b.txt needs; it is moved over
        // before a.txt receives its new bytes.
        let local = snap(&[("a.txt", "new"), ("b.txt", "old")]);
        let remote = snap(&[("a.txt", "old")]);
        let p = plan(&local, &remote);
        assert_eq!(
            p.transfers,
            vec![mv("a.txt", "b.txt"), SyncAction::Upload(rel("a.txt"))]
        );
        assert_eq!(apply(&remote, &p, &local), local);
    }

    #[test]
    fn test_swap_goes_through_stash() {
        let local = snap(&[("a.txt", "1"), ("b.txt", "2")]);
        let remote = snap(&[("a.txt", "2"), ("b.txt", "1")]);
        let p = plan(&local, &remote);

        let stash = format!("{STASH_DIR}/{}", ContentHash::from_bytes(b"1").to_hex());
        assert_eq!(
            p.transfers,
            vec![
                mv("b.txt", &stash),
                mv("a.txt", "b.txt"),
                mv(&stash, "a.txt"),
            ]
        );
        assert!(p.cleanup.is_empty());
        assert_eq!(apply(&remote, &p, &local), local);
    }

    #[test]
    fn test_file_in_place_of_directory_is_parked() {
        let local = snap(&[("x/f.txt", "A")]);
        let remote = snap(&[("x", "B")]);
        let p = plan(&local, &remote);

        let stash_b = format!("{STASH_DIR}/{}", ContentHash::from_bytes(b"B").to_hex());
        assert_eq!(
            p.transfers,
            vec![mv("x", &stash_b), SyncAction::Upload(rel("x/f.txt"))]
        );
        assert_eq!(p.cleanup, vec![SyncAction::Delete(rel(&stash_b))]);
    }

    #[test]
    fn test_directory_in_place_of_file_is_parked() {
        let local = snap(&[("x", "A")]);
        let remote = snap(&[("x/a", "B"), ("x/b", "A"), ("xy", "C")]);
        let p = plan(&local, &remote);

        let stash_a = format!("{STASH_DIR}/{}", ContentHash::from_bytes(b"A").to_hex());
        let stash_b = format!("{STASH_DIR}/{}", ContentHash::from_bytes(b"B").to_hex());
        assert_eq!(
            p.transfers,
            vec![mv("x/a", &stash_b), mv("x/b", &stash_a), mv(&stash_a, "x")]
        );
        assert_eq!(
            p.cleanup,
            vec![SyncAction::Delete(rel(&stash_b)), SyncAction::Delete(rel("xy"))]
        );
        assert_eq!(p.upload_count(), 0);
    }

    #[test]
    fn test_stash_avoids_file_named_like_it() {
        let local = snap(&[(".dropsync-stash", "mine"), ("a.txt", "1"), ("b.txt", "2")]);
        let remote = snap(&[(".dropsync-stash", "mine"), ("a.txt", "2"), ("b.txt", "1")]);
        let p = plan(&local, &remote);

        let stashed: Vec<_> = p
            .transfers
            .iter()
            .filter_map(|a| match a {
                SyncAction::MoveRename { dst, .. } if dst.as_str().starts_with(STASH_DIR) => {
                    Some(dst.as_str().to_string())
                }
                _ => None,
            })
            .collect();
        assert_eq!(stashed.len(), 1);
        assert!(stashed[0].starts_with(".dropsync-stash.1/"), "{stashed:?}");
        assert_eq!(apply(&remote, &p, &local), local);
    }

    #[test]
    fn test_long_rename_chain() {
        // Every file takes over the content of its successor: a renumbered
        // series. Each link is one pending path, so this must not recurse.
        const N: usize = 50_000;
        let name = |i: usize| rel(&format!("frames/frame_{i:06}.png"));
        let content = |i: usize| ContentHash::from_bytes(format!("frame {i}").as_bytes());
        let local = Snapshot::from_entries((0..N).map(|i| (name(i), content(i))));
        let remote = Snapshot::from_entries((0..N).map(|i| (name(i), content(i + 1))));

        let p = plan(&local, &remote);
        assert_eq!(p.transfers.len(), N);
        assert_eq!(p.upload_count(), 1);
        // The far end of the chain moves first, the head is uploaded last.
        assert_eq!(
            p.transfers[0],
            mv("frames/frame_049998.png", "frames/frame_049999.png")
        );
        assert_eq!(
            p.transfers[N - 1],
            SyncAction::Upload(rel("frames/frame_000000.png"))
        );
        assert!(p.cleanup.is_empty());
        assert_eq!(apply(&remote, &p, &local), local);
    }

    #[test]
    fn test_changed_content_in_place_uploads() {
        let local = snap(&[("a.txt", "v2")]);
        let remote = snap(&[("a.txt", "v1")]);
        let p = plan(&local, &remote);
        assert_eq!(p.transfers, vec![SyncAction::Upload(rel("a.txt"))]);
        assert!(p.cleanup.is_empty());
    }

    fn fixtures() -> Vec<(Snapshot, Snapshot)> {
        vec![
            (snap(&[("a", "1"), ("b", "2"), ("c/d", "3")]), Snapshot::empty()),
            (
                snap(&[("a", "1"), ("b", "1"), ("c", "2")]),
                snap(&[("x", "1"), ("c", "1"), ("y", "9")]),
            ),
            (
                snap(&[("dir/a", "A"), ("dir/b", "B"), ("other", "A")]),
                snap(&[("dir/a", "B"), ("dir/b", "A"), ("stale", "C")]),
            ),
            (Snapshot::empty(), snap(&[("gone", "1"), ("gone2", "1")])),
            (
                snap(&[("p1", "x"), ("p2", "y"), ("p3", "z")]),
                snap(&[("p3", "x"), ("p1", "y"), ("p2", "z")]),
            ),
            (
                snap(&[("a", "new"), ("b", "old"), ("c", "old"), ("d", "fresh")]),
                snap(&[("a", "old"), ("d", "new"), ("e", "fresh")]),
            ),
        ]
    }

    #[test]
    fn test_plan_completes_and_is_idempotent() {
        for (local, remote) in fixtures() {
            let p = plan(&local, &remote);
            let applied = apply(&remote, &p, &local);
            assert_eq!(applied, local, "plan {p:?} did not converge");
            assert!(plan(&local, &applied).is_empty(), "second plan not empty");
        }
    }

    #[test]
    fn test_no_upload_for_content_already_remote() {
        for (local, remote) in fixtures() {
            let remote_hashes: BTreeSet<_> = remote.iter().map(|(_, h)| *h).collect();
            for action in &plan(&local, &remote).transfers {
                if let SyncAction::Upload(path) = action {
                    assert!(
                        !remote_hashes.contains(local.get(path).unwrap()),
                        "uploaded {path} although its content is on the remote"
                    );
                }
            }
        }
    }

    #[test]
    fn test_cleanup_never_removes_a_source() {
        for (local, remote) in fixtures() {
            let p = plan(&local, &remote);
            let sources: BTreeSet<_> = p.transfers.iter().filter_map(SyncAction::source).collect();
            for action in &p.cleanup {
                assert!(matches!(action, SyncAction::Delete(_)));
                assert!(!sources.contains(action.target()), "{action} removes a source");
            }
            assert!(p.transfers.iter().all(|a| !matches!(a, SyncAction::Delete(_))));
        }
    }

    #[test]
    fn test_deterministic() {
        for (local, remote) in fixtures() {
            assert_eq!(plan(&local, &remote), plan(&local, &remote));
        }
    }
}
