use std::path::PathBuf;

use notify::{
    Event, EventKind,
    event::{ModifyKind, RenameMode},
};

use hlive_model::ChangeKind;

/// Map a backend event kind to a reload-worthy change, or `None` to drop it.
///
/// A rename counts as the destination appearing and the source going away.
/// Metadata-only changes (chmod, mtime touch) and access events never trigger
/// a reload.
pub fn classify(kind: &EventKind) -> Option<ChangeKind> {
    match kind {
        EventKind::Create(_) => Some(ChangeKind::Create),
        EventKind::Remove(_) => Some(ChangeKind::Remove),
        EventKind::Modify(ModifyKind::Data(_) | ModifyKind::Any) => Some(ChangeKind::Write),
        EventKind::Modify(ModifyKind::Name(mode)) => match mode {
            RenameMode::To | RenameMode::Both | RenameMode::Any => Some(ChangeKind::Create),
            RenameMode::From => Some(ChangeKind::Remove),
            RenameMode::Other => None,
        },
        EventKind::Modify(ModifyKind::Metadata(_) | ModifyKind::Other) => None,
        EventKind::Access(_) | EventKind::Any | EventKind::Other => None,
    }
}

/// Per-path changes carried by one backend event.
///
/// A paired rename carries `[from, to]`; the source is reported removed and
/// the destination created.
pub fn changes(event: Event) -> Vec<(PathBuf, ChangeKind)> {
    if let EventKind::Modify(ModifyKind::Name(RenameMode::Both)) = event.kind {
        let mut paths = event.paths.into_iter();
        return match (paths.next(), paths.next()) {
            (Some(from), Some(to)) => vec![(from, ChangeKind::Remove), (to, ChangeKind::Create)],
            (Some(to), None) => vec![(to, ChangeKind::Create)],
            _ => Vec::new(),
        };
    }
    match classify(&event.kind) {
        Some(kind) => event.paths.into_iter().map(|p| (p, kind)).collect(),
        None => Vec::new(),
    }
}
