mod common;

use std::io::Write;
use std::rc::Rc;

use dictfs::error::Error;
use dictfs::{Config, DirectoryNode, MemoryStore};

#[test]
fn test_config_from_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(file, r#"{{"root": "/bucket/photos/", "sniffLength": 32}}"#).unwrap();

    let config = Config::from_file(file.path()).unwrap();
    assert_eq!(config.root, "/bucket/photos/");
    assert_eq!(config.sniff_length, 32);
}

#[test]
fn test_config_missing_file() {
    let dir = tempfile::tempdir().unwrap();
    let err = Config::from_file(dir.path().join("dictfs.json")).unwrap_err();
    assert!(matches!(err, Error::IoError(_)));
}

#[test]
fn test_open_from_config() {
    common::init_logging();
    let store = Rc::new(MemoryStore::with_objects([("bucket/photos/a.txt", "a")]));

    let root = DirectoryNode::from_config(&Config::new("/bucket/photos/"), store.clone()).unwrap();
    assert_eq!(root.path().unwrap(), "bucket/photos");
    assert_eq!(root.name().unwrap(), "photos");
    assert_eq!(root.resolver().unwrap().sniff_length(), 100);

    let config = Config {
        root: "bucket".to_string(),
        sniff_length: 8,
    };
    let root = DirectoryNode::from_config(&config, store.clone()).unwrap();
    assert_eq!(root.resolver().unwrap().sniff_length(), 8);

    assert!(matches!(
        DirectoryNode::from_config(&Config::new("missing"), store),
        Err(Error::NotFound(_))
    ));
}
