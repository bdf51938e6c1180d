//! End-to-end tailing properties against a real file on disk.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;

use expo_core::LogEncoding;
use expo_tail::LogTailer;
use filetime::FileTime;
use tempfile::TempDir;

fn append(path: &Path, text: &str) {
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .unwrap();
    file.write_all(text.as_bytes()).unwrap();
}

#[test]
fn no_line_loss_or_duplication_across_polls() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("status.log");
    let mut tailer = LogTailer::new(&path, LogEncoding::Utf8);

    let mut expected = Vec::new();
    let mut collected = Vec::new();

    // Grow the file in uneven bursts, polling between them, with a partial
    // line left dangling at several points.
    let bursts = [
        "line-0\nline-1\n",
        "line-2\nline-",
        "3\n",
        "",
        "line-4\nline-5\nline-6\n",
        "line-7",
        "\n",
    ];
    for burst in bursts {
        append(&path, burst);
        collected.extend(tailer.poll().unwrap());
    }
    for i in 0..8 {
        expected.push(format!("line-{i}"));
    }
    assert_eq!(collected, expected);

    // Nothing left once the file stops growing.
    assert!(tailer.poll().unwrap().is_empty());
}

#[test]
fn same_size_replacement_with_older_mtime_is_rotation() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("status.log");
    let mut tailer = LogTailer::new(&path, LogEncoding::Utf8);

    append(&path, "aaaa\nbbbb\n");
    assert_eq!(tailer.poll().unwrap().len(), 2);

    // Replace with a same-length file whose mtime predates the original.
    std::fs::write(&path, "cccc\ndddd\n").unwrap();
    let meta = std::fs::metadata(&path).unwrap();
    let older = FileTime::from_unix_time(FileTime::from_last_modification_time(&meta).seconds() - 3600, 0);
    filetime::set_file_mtime(&path, older).unwrap();

    assert_eq!(tailer.poll().unwrap(), vec!["cccc", "dddd"]);
}

#[test]
fn rotation_to_shorter_file_rereads_everything_exactly_once() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("status.log");
    let mut tailer = LogTailer::new(&path, LogEncoding::Utf8);

    append(&path, "old-0\nold-1\nold-2\nold-3\n");
    tailer.poll().unwrap();

    std::fs::write(&path, "fresh-0\n").unwrap();
    append(&path, "fresh-1\n");

    let mut collected = tailer.poll().unwrap();
    collected.extend(tailer.poll().unwrap());
    assert_eq!(collected, vec!["fresh-0", "fresh-1"]);
}
