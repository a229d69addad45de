//! End-to-end exercise of Importer -> Filter -> Exporter wired through real
//! shared-memory buffers, all within one process (each template only needs
//! a `SlotBuffer` handle, not a separate OS process, to do its job).

use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;

use mimo_ring::{BufferConfig, SlotBuffer};
use mimo_worker::{BufferIO, Config, Exporter, Filter, ImportOutcome, Importer, Keep};

#[test]
fn importer_filter_exporter_chain() {
    let raw = Arc::new(SlotBuffer::<f64, 1>::create("pipeline-raw", BufferConfig::new(4, false)).unwrap());
    let filtered = Arc::new(SlotBuffer::<f64, 1>::create("pipeline-filtered", BufferConfig::new(4, false)).unwrap());

    let importer_io = BufferIO::new("importer", vec![], vec![raw.clone()], vec![], Config::new(), PathBuf::from("/tmp"));
    let importer = Importer::new(importer_io).unwrap();

    let filter_io = BufferIO::new(
        "filter",
        vec![raw.clone()],
        vec![filtered.clone()],
        vec![],
        Config::new(),
        PathBuf::from("/tmp"),
    );
    let filter = Filter::new(filter_io).unwrap();

    let exporter_io = BufferIO::new("exporter", vec![filtered.clone()], vec![], vec![], Config::new(), PathBuf::from("/tmp"));
    let exporter = Exporter::new(exporter_io).unwrap();

    let exported = Arc::new(Mutex::new(Vec::new()));
    let exported_handle = exported.clone();

    let filter_thread = thread::spawn(move || {
        filter.run(|_, data| Keep::All(data[0] >= 0.0)).unwrap();
    });

    let exporter_thread = thread::spawn(move || {
        exporter.run(|metadata, data| exported_handle.lock().unwrap().push((metadata.counter, data[0]))).unwrap();
    });

    let counter = AtomicUsize::new(0);
    importer
        .run(
            || {
                let n = counter.fetch_add(1, Ordering::Relaxed);
                if n >= 5 {
                    ImportOutcome::Exhausted
                } else {
                    ImportOutcome::Produced([if n % 2 == 0 { n as f64 } else { -(n as f64) }])
                }
            },
            || false,
        )
        .unwrap();

    filter_thread.join().unwrap();
    exporter_thread.join().unwrap();

    let results = exported.lock().unwrap();
    assert_eq!(results.len(), 3);
    assert!(results.iter().all(|&(_, value)| value >= 0.0));
}
