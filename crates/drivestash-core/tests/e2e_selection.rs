/// End-to-end selection tests: accumulating entries from several listings
/// and flattening them for export.
use drivestash_core::selection::{ChooserOutcome, PendingSelection};
use drivestash_core::walker;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

fn touch(path: &Path, bytes: &[u8]) {
    fs::write(path, bytes).unwrap();
}

/// `add([fileA, dirB])` with `dirB = {x.txt, y.txt}` expands to all three files.
#[test]
fn expansion_flattens_selected_directories() {
    let tmp = TempDir::new().unwrap();
    let file_a = tmp.path().join("fileA");
    let dir_b = tmp.path().join("dirB");
    fs::create_dir(&dir_b).unwrap();
    touch(&file_a, b"aaaa");
    touch(&dir_b.join("x.txt"), b"x");
    touch(&dir_b.join("y.txt"), b"yy");

    let mut selection = PendingSelection::new();
    let listing = walker::list_children(tmp.path()).unwrap();
    assert_eq!(selection.add(listing), 2);

    let outcome = selection.expand_for_archiving();
    let mut names: Vec<&str> = outcome.files.iter().map(|f| f.name()).collect();
    names.sort_unstable();
    assert_eq!(names, vec!["fileA", "x.txt", "y.txt"]);
    assert!(outcome.files.iter().all(|f| !f.is_directory()));
    assert!(outcome.warnings.is_empty());
    // The selection itself still holds the two original entries.
    assert_eq!(selection.len(), 2);
}

/// Entries from two different directories accumulate without duplicates.
#[test]
fn selections_accumulate_across_listings() {
    let tmp = TempDir::new().unwrap();
    let left = tmp.path().join("left");
    let right = tmp.path().join("right");
    fs::create_dir(&left).unwrap();
    fs::create_dir(&right).unwrap();
    touch(&left.join("l.txt"), b"l");
    touch(&right.join("r.txt"), b"r");

    let mut selection = PendingSelection::new();
    selection.add(walker::list_children(&left).unwrap());
    selection.add(walker::list_children(&right).unwrap());
    // Re-adding the first listing changes nothing.
    assert_eq!(selection.add(walker::list_children(&left).unwrap()), 0);

    assert_eq!(selection.len(), 2);
    assert!(selection.contains(&left.join("l.txt")));
    assert!(selection.contains(&right.join("r.txt")));
}

#[test]
fn removing_an_absent_path_is_a_no_op() {
    let tmp = TempDir::new().unwrap();
    let kept = tmp.path().join("kept.txt");
    touch(&kept, b"k");

    let mut selection = PendingSelection::new();
    selection.add_paths([&kept]);
    assert!(!selection.remove(&tmp.path().join("never-added")));
    assert_eq!(selection.len(), 1);
    assert!(selection.remove(&kept));
    assert!(selection.is_empty());
}

/// Sizes are only known after an explicit resolve, and never for directories.
#[test]
fn sizes_resolve_lazily() {
    let tmp = TempDir::new().unwrap();
    touch(&tmp.path().join("a.bin"), &[0; 300]);
    touch(&tmp.path().join("b.bin"), &[0; 700]);
    fs::create_dir(tmp.path().join("dir")).unwrap();

    let mut selection = PendingSelection::new();
    selection.add(walker::list_children(tmp.path()).unwrap());
    assert_eq!(selection.known_size(), 0);

    assert_eq!(selection.resolve_sizes(), 2);
    assert_eq!(selection.known_size(), 1000);
    let dir = selection
        .entries()
        .iter()
        .find(|e| e.is_directory())
        .unwrap();
    assert_eq!(dir.size(), None);
    // Nothing left to resolve.
    assert_eq!(selection.resolve_sizes(), 0);
}

/// Paths from a chooser or a drop are taken as-is; vanished ones are skipped.
#[test]
fn chooser_and_dropped_paths() {
    let tmp = TempDir::new().unwrap();
    let real = tmp.path().join("real.txt");
    touch(&real, b"r");

    let mut selection = PendingSelection::new();
    assert_eq!(selection.add_chosen(ChooserOutcome::Cancelled), 0);
    assert_eq!(
        selection.add_chosen(ChooserOutcome::Selected(vec![
            real.clone(),
            tmp.path().join("vanished.txt"),
        ])),
        1
    );
    assert_eq!(selection.add_paths([tmp.path()]), 1);
    assert_eq!(selection.len(), 2);
    assert!(selection.entries()[1].is_directory());
}

/// A selected directory deleted before export is reported, not fatal.
#[test]
fn expansion_warns_about_vanished_directories() {
    let tmp = TempDir::new().unwrap();
    let doomed = tmp.path().join("doomed");
    fs::create_dir(&doomed).unwrap();
    let kept = tmp.path().join("kept.txt");
    touch(&kept, b"k");

    let mut selection = PendingSelection::new();
    selection.add_paths([&doomed, &kept]);
    fs::remove_dir(&doomed).unwrap();

    let outcome = selection.expand_for_archiving();
    assert_eq!(outcome.files.len(), 1);
    assert_eq!(outcome.warnings.len(), 1);
    assert_eq!(outcome.warnings[0].path, doomed);
}
