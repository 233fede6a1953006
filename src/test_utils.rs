//! Test helpers shared by the model fixture tests.
//!
//! Golden-copy record fixtures live under `tests/data/`; the helper here walks a
//! fixture directory, decodes every selected file, and hands each decoded value to a
//! validation closure.

use std::fs;
use std::path::Path;

/// Decodes and validates every fixture file in a directory.
///
/// Files are visited in name order so failures reproduce deterministically. The run
/// fails if the directory is missing, a selected fixture does not decode, or nothing
/// passed the filter (an empty fixture run usually means a renamed directory).
pub(crate) fn for_each_fixture<T, E>(
    dir: &Path,
    select: impl Fn(&str) -> bool,
    decode: impl Fn(&str) -> Result<T, E>,
    check: impl Fn(&str, &T),
) where
    E: std::fmt::Display,
{
    assert!(dir.is_dir(), "fixture directory missing: {}", dir.display());
    let mut names: Vec<String> = fs::read_dir(dir)
        .expect("fixture directory should be readable")
        .map(|entry| {
            entry
                .expect("fixture directory entry")
                .file_name()
                .to_string_lossy()
                .into_owned()
        })
        .filter(|name| select(name))
        .collect();
    names.sort();
    assert!(!names.is_empty(), "no fixtures selected in {}", dir.display());
    for name in names {
        let raw = fs::read_to_string(dir.join(&name))
            .unwrap_or_else(|err| panic!("fixture {name} is unreadable: {err}"));
        let value =
            decode(&raw).unwrap_or_else(|err| panic!("fixture {name} does not decode: {err}"));
        check(&name, &value);
    }
}
