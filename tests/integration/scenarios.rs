use crate::integration::support::TestStore;
use sqlfs::payload::SimpleFileData;
use sqlfs::{FsError, FsId, FsNode, Node, NodeKind};

#[test]
fn fresh_store_has_root_directory() {
    let store = TestStore::new();
    let fs = store.open();
    let root = fs.root().unwrap();

    assert_eq!(root.id(), FsId::ROOT);
    assert_eq!(root.kind(), NodeKind::Dir);
    assert!(root.parent().unwrap().is_none());
    assert!(matches!(fs.resolve("/").unwrap(), Node::Dir(_)));
}

#[test]
fn add_dir_then_lookup_by_name_and_path() {
    let store = TestStore::new();
    let fs = store.open();
    let root = fs.root().unwrap();

    let a = root.add_dir("a").unwrap();
    let child = root.get_child("a").unwrap().into_dir().unwrap();
    assert_eq!(child.id(), a.id());
    assert_eq!(child.name().unwrap(), "a");
    assert_eq!(root.resolve_dir("a").unwrap().id(), a.id());
    assert_eq!(fs.resolve_dir("/a").unwrap().id(), a.id());
}

#[test]
fn text_payload_roundtrip_and_size() {
    let store = TestStore::new();
    let fs = store.open();
    let a = fs.root().unwrap().add_dir("a").unwrap();
    let file = a.add_file("f.txt").unwrap();
    assert_eq!(file.payload_id().unwrap(), FsId::NO_PAYLOAD);

    file.write_payload(&SimpleFileData::from_text("hello")).unwrap();
    assert_eq!(file.size().unwrap(), 10);

    let mut loaded = SimpleFileData::new();
    file.read_payload(&mut loaded).unwrap();
    assert_eq!(loaded.text(), Some("hello"));
}

#[test]
fn payload_survives_reopen() {
    let store = TestStore::new();
    {
        let fs = store.open();
        let file = fs.root().unwrap().add_file("kept.bin").unwrap();
        file.write_payload(&SimpleFileData::from_bytes(vec![9u8, 8, 7]))
            .unwrap();
        fs.close();
    }
    let fs = store.open();
    let file = fs.resolve_file("/kept.bin").unwrap();
    let mut loaded = SimpleFileData::new();
    file.read_payload(&mut loaded).unwrap();
    assert_eq!(loaded.binary(), Some(&[9u8, 8, 7][..]));
    assert_eq!(file.size().unwrap(), 3);
}

#[test]
fn move_file_to_root() {
    let store = TestStore::new();
    let fs = store.open();
    let root = fs.root().unwrap();
    let a = root.add_dir("a").unwrap();
    let file = a.add_file("f.txt").unwrap();

    fs.resolve_file("/a/f.txt").unwrap().move_to_path("/").unwrap();

    assert_eq!(root.resolve_file("f.txt").unwrap().id(), file.id());
    assert!(matches!(
        a.resolve_file("f.txt"),
        Err(FsError::ChildNotFound(_))
    ));
    assert_eq!(file.parent().unwrap().unwrap().id(), root.id());
    assert_eq!(a.child_count().unwrap(), 0);
    assert_eq!(root.child_count().unwrap(), 2);
}

#[test]
fn relative_move_resolves_from_current_parent() {
    let store = TestStore::new();
    let fs = store.open();
    let root = fs.root().unwrap();
    let a = root.add_dir("a").unwrap();
    let b = a.add_dir("b").unwrap();
    let file = a.add_file("f").unwrap();

    file.move_to_path("b").unwrap();
    assert_eq!(b.resolve_file("f").unwrap().id(), file.id());

    assert!(matches!(
        file.move_to_path("nowhere"),
        Err(FsError::DestDirNotFound(_))
    ));
    assert!(matches!(file.move_to_path(""), Err(FsError::EmptyPath)));
}

#[test]
fn recursive_delete_then_lookup_fails() {
    let store = TestStore::new();
    let fs = store.open();
    let root = fs.root().unwrap();
    let a = root.add_dir("a").unwrap();
    a.add_dir("inner").unwrap().add_file("deep").unwrap();
    a.add_file("f.txt")
        .unwrap()
        .write_payload(&SimpleFileData::from_text("x"))
        .unwrap();

    fs.resolve("/a").unwrap().delete().unwrap();

    assert!(matches!(root.get_child("a"), Err(FsError::ChildNotFound(_))));
    assert!(!fs.exists("/a/inner/deep").unwrap());
}

#[test]
fn deleting_twice_fails_cleanly() {
    let store = TestStore::new();
    let fs = store.open();
    let root = fs.root().unwrap();
    let dir = root.add_dir("once").unwrap();
    let file = root.add_file("once.txt").unwrap();

    dir.delete().unwrap();
    file.delete().unwrap();
    assert!(dir.delete().is_err());
    assert!(file.delete().is_err());
    assert_eq!(root.child_count().unwrap(), 0);
}

#[test]
fn moving_into_descendant_or_self_is_rejected() {
    let store = TestStore::new();
    let fs = store.open();
    let root = fs.root().unwrap();
    let d = root.add_dir("d").unwrap();
    let child = d.add_dir("child").unwrap();
    let grandchild = child.add_dir("grandchild").unwrap();

    for target in [&child, &grandchild] {
        assert!(matches!(d.move_to(target), Err(FsError::CannotMoveToSubdir)));
    }
    assert!(matches!(d.move_to(&d), Err(FsError::CannotMoveToSelf)));
    assert!(matches!(root.move_to(&d), Err(FsError::CannotMoveRoot)));
    assert!(grandchild.is_ancestor(&d).unwrap());
    assert!(!d.is_ancestor(&grandchild).unwrap());

    // Nothing moved.
    assert_eq!(fs.resolve_dir("/d/child/grandchild").unwrap().id(), grandchild.id());
}

#[test]
fn move_onto_existing_name_is_rejected() {
    let store = TestStore::new();
    let fs = store.open();
    let root = fs.root().unwrap();
    let a = root.add_dir("a").unwrap();
    let b = root.add_dir("b").unwrap();
    a.add_file("same").unwrap();
    let other = b.add_file("same").unwrap();

    assert!(matches!(
        other.move_to(&a),
        Err(FsError::NameAlreadyExists(n)) if n == "same"
    ));
    assert_eq!(other.parent().unwrap().unwrap().id(), b.id());
}

#[test]
fn duplicate_add_leaves_child_count_unchanged() {
    let store = TestStore::new();
    let fs = store.open();
    let root = fs.root().unwrap();
    root.add_file("dup").unwrap();
    let before = root.child_count().unwrap();

    assert!(matches!(root.add_dir("dup"), Err(FsError::NameAlreadyExists(_))));
    assert!(matches!(root.add_file(" dup "), Err(FsError::NameAlreadyExists(_))));
    assert_eq!(root.child_count().unwrap(), before);
}

#[test]
fn rename_rules() {
    let store = TestStore::new();
    let fs = store.open();
    let root = fs.root().unwrap();
    let a = root.add_dir("a").unwrap();
    root.add_dir("b").unwrap();

    a.rename("renamed").unwrap();
    assert_eq!(fs.resolve_dir("/renamed").unwrap().id(), a.id());
    assert!(matches!(a.rename("b"), Err(FsError::NameAlreadyExists(_))));
    assert!(matches!(a.rename("bad:name"), Err(FsError::InvalidName(_))));
    assert!(matches!(root.rename("x"), Err(FsError::CannotRenameRoot)));
}

#[test]
fn mutations_touch_modification_time() {
    let store = TestStore::new();
    let fs = store.open();
    let root = fs.root().unwrap();
    let dir = root.add_dir("t").unwrap();
    let created = dir.created().unwrap();
    assert!(dir.modified().unwrap() >= created);

    std::thread::sleep(std::time::Duration::from_millis(20));
    dir.rename("t2").unwrap();
    assert!(dir.modified().unwrap() > created);
    assert_eq!(dir.created().unwrap(), created);
}

#[test]
fn node_by_id_materializes_both_kinds() {
    let store = TestStore::new();
    let fs = store.open();
    let root = fs.root().unwrap();
    let dir = root.add_dir("d").unwrap();
    let file = dir.add_file("f").unwrap();

    assert!(matches!(fs.node_by_id(dir.id()).unwrap(), Some(Node::Dir(_))));
    assert!(matches!(fs.node_by_id(file.id()).unwrap(), Some(Node::File(_))));
    assert!(fs.node_by_id(FsId::new(999)).unwrap().is_none());

    let stat = file.stat().unwrap();
    assert_eq!(stat.kind, NodeKind::File);
    assert_eq!(stat.parent, Some(dir.id()));
    assert_eq!(stat.name, "f");
}
