/// Compiling the same document must give byte-identical output, whether
/// repeated or run concurrently
use busgen_compiler::{compile_xml, CompileOptions};
use std::thread;

const FIXTURES: [&str; 4] = [
    include_str!("fixtures/secret.xml"),
    include_str!("fixtures/usb.xml"),
    include_str!("fixtures/settings.xml"),
    include_str!("fixtures/shapes.xml"),
];

#[test]
fn test_repeated_compilation_is_identical() {
    for xml in FIXTURES {
        let results: Vec<String> = (0..10)
            .map(|_| compile_xml(xml, CompileOptions::default()).expect("Compilation failed"))
            .collect();

        for i in 1..results.len() {
            assert_eq!(
                results[0], results[i],
                "Compilation {} differs from compilation 0",
                i
            );
        }
    }
}

#[test]
fn test_parallel_compilation_is_identical() {
    let expected: Vec<String> = FIXTURES
        .iter()
        .map(|xml| compile_xml(xml, CompileOptions::default()).unwrap())
        .collect();

    let handles: Vec<_> = (0..4)
        .map(|_| {
            thread::spawn(|| {
                FIXTURES
                    .iter()
                    .map(|xml| compile_xml(xml, CompileOptions::default()).unwrap())
                    .collect::<Vec<_>>()
            })
        })
        .collect();

    for handle in handles {
        assert_eq!(handle.join().unwrap(), expected);
    }
}
