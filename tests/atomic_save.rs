use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

use kubesel::loader::load_from_file;
use kubesel::session::{Overlay, OwnerIdentity};
use tempfile::TempDir;

#[test]
fn readers_never_see_a_partial_overlay() {
    let dir = TempDir::new().unwrap();
    let owner = OwnerIdentity::new(1234, 99);
    let path = dir.path().join(owner.file_name());

    let mut overlay = Overlay::new_for_owner(&path, owner).unwrap();
    overlay.set_cluster_name("initial");
    overlay.set_namespace("nnnnnnn");
    overlay.save().unwrap();

    let done = Arc::new(AtomicBool::new(false));
    let reader = {
        let done = Arc::clone(&done);
        let path = path.clone();
        thread::spawn(move || {
            let mut reads = 0;
            while !done.load(Ordering::Relaxed) || reads == 0 {
                let loaded = load_from_file(&path);
                let overlay = Overlay::from_loaded(&loaded).unwrap();
                assert_eq!(overlay.owner(), owner);
                assert!(overlay.cluster_name() == "initial" || overlay.cluster_name().starts_with("cluster-"));
                assert_eq!(overlay.namespace().len(), overlay.cluster_name().len());
                reads += 1;
            }
            reads
        })
    };

    for i in 0..200 {
        // Vary the document size so a torn write would be visible.
        let name = format!("cluster-{}", "x".repeat(i % 37));
        overlay.set_namespace("n".repeat(name.len()));
        overlay.set_cluster_name(name);
        overlay.save().unwrap();
    }

    done.store(true, Ordering::Relaxed);
    let reads = reader.join().unwrap();
    assert!(reads > 0);

    let leftovers: Vec<_> = std::fs::read_dir(dir.path()).unwrap().collect();
    assert_eq!(leftovers.len(), 1);
}
