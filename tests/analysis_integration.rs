//! Integration tests for detection and structural analysis over the
//! per-language fixtures in `testdata/`.

use std::path::PathBuf;

use codedoc::analysis::{self, AnalysisError};
use codedoc::artifact::ingest;
use codedoc::config::LimitsConfig;
use codedoc::detect;
use codedoc::Language;

fn testdata_path(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("testdata")
        .join(name)
}

fn read_fixture(name: &str) -> String {
    std::fs::read_to_string(testdata_path(name)).expect("fixture should exist")
}

struct Expected {
    file: &'static str,
    language: Language,
    lines: usize,
    functions: usize,
    documented: usize,
    classes: usize,
    percentage: u8,
    undocumented: &'static [&'static str],
}

const FIXTURES: &[Expected] = &[
    Expected {
        file: "inventory.py",
        language: Language::Python,
        lines: 28,
        functions: 5,
        documented: 3,
        classes: 1,
        percentage: 60,
        undocumented: &["add", "load"],
    },
    Expected {
        file: "cart.js",
        language: Language::JavaScript,
        lines: 38,
        functions: 6,
        documented: 3,
        classes: 1,
        percentage: 50,
        undocumented: &["tax", "constructor", "clear"],
    },
    Expected {
        file: "Account.java",
        language: Language::Java,
        lines: 39,
        functions: 4,
        documented: 2,
        classes: 1,
        percentage: 50,
        undocumented: &["toString", "getBalance"],
    },
    Expected {
        file: "polygon.cpp",
        language: Language::Cpp,
        lines: 51,
        functions: 10,
        documented: 3,
        classes: 2,
        percentage: 30,
        undocumented: &[
            "Polygon",
            "Polygon",
            "~Polygon",
            "area",
            "Polygon::Polygon",
            "Polygon::~Polygon",
            "Polygon::area",
        ],
    },
    Expected {
        file: "Cart.cs",
        language: Language::CSharp,
        lines: 43,
        functions: 5,
        documented: 2,
        classes: 2,
        percentage: 40,
        undocumented: &["Cart", "Save", "LoadAsync"],
    },
    Expected {
        file: "Greeter.php",
        language: Language::Php,
        lines: 36,
        functions: 4,
        documented: 2,
        classes: 1,
        percentage: 50,
        undocumented: &["__construct", "helper"],
    },
    Expected {
        file: "settings.rb",
        language: Language::Ruby,
        lines: 37,
        functions: 5,
        documented: 2,
        classes: 2,
        percentage: 40,
        undocumented: &["save", "initialize", "empty?"],
    },
    Expected {
        file: "store.go",
        language: Language::Go,
        lines: 50,
        functions: 3,
        documented: 2,
        classes: 3,
        percentage: 67,
        undocumented: &["Get"],
    },
];

#[test]
fn test_fixture_statistics() {
    for expected in FIXTURES {
        let text = read_fixture(expected.file);
        let language = detect::detect(expected.file, &text);
        assert_eq!(language, expected.language, "{}", expected.file);

        let result = analysis::scan(&text, language);
        let stats = result.statistics;
        assert_eq!(stats.total_lines, expected.lines, "{} lines", expected.file);
        assert_eq!(
            stats.functions_count, expected.functions,
            "{} functions: {:?}",
            expected.file, result.definitions
        );
        assert_eq!(
            stats.documented_functions_count, expected.documented,
            "{} documented: {:?}",
            expected.file, result.definitions
        );
        assert_eq!(stats.classes_count, expected.classes, "{} classes", expected.file);
        assert_eq!(
            stats.documentation_percentage, expected.percentage,
            "{} percentage",
            expected.file
        );

        let undocumented: Vec<&str> = result
            .undocumented_functions()
            .map(|d| d.name.as_str())
            .collect();
        assert_eq!(undocumented, expected.undocumented, "{}", expected.file);
    }
}

#[test]
fn test_fixtures_detected_from_content() {
    for expected in FIXTURES {
        let text = read_fixture(expected.file);
        assert_eq!(
            detect::detect_from_content(&text),
            expected.language,
            "{}: {:?}",
            expected.file,
            detect::score_content(&text)
        );
    }
}

#[test]
fn test_statistics_invariants() {
    for expected in FIXTURES {
        let text = read_fixture(expected.file);
        for language in Language::ALL {
            let stats = analysis::analyze(&text, language);
            assert!(stats.documented_functions_count <= stats.functions_count);
            assert!(stats.documentation_percentage <= 100);
            assert_eq!(stats, analysis::analyze(&text, language));
        }
    }
}

#[test]
fn test_python_scenario_half_documented() {
    let text = read_fixture("geometry.py");
    assert_eq!(text.lines().count(), 20);

    let stats = analysis::analyze(&text, Language::Python);
    assert_eq!(stats.functions_count, 2);
    assert_eq!(stats.documented_functions_count, 1);
    assert_eq!(stats.documentation_percentage, 50);
}

#[test]
fn test_preceding_triple_quoted_string_documents_python() {
    let text = "\"\"\"Area of a circle.\"\"\"\ndef circle(r):\n    return 3.14 * r * r\n\n\ndef square(s):\n    return s * s\n";
    let stats = analysis::analyze(text, Language::Python);
    assert_eq!(stats.functions_count, 2);
    assert_eq!(stats.documented_functions_count, 1);
}

#[test]
fn test_extension_beats_content() {
    let text = read_fixture("store.go");
    assert_eq!(detect::detect("store.py", &text), Language::Python);
    assert_eq!(detect::detect("STORE.GO", &text), Language::Go);
}

#[test]
fn test_ingest_fixture() {
    let bytes = std::fs::read(testdata_path("Account.java")).unwrap();
    let artifact = ingest("Account.java", &bytes, &LimitsConfig::default()).unwrap();
    assert_eq!(artifact.language, Language::Java);
    assert_eq!(artifact.baseline.functions_count, 4);

    let limits = LimitsConfig {
        max_payload_bytes: 100,
        ..LimitsConfig::default()
    };
    assert!(matches!(
        ingest("Account.java", &bytes, &limits),
        Err(AnalysisError::PayloadTooLarge { limit: 100, .. })
    ));
}

#[test]
fn test_ingest_rejects_invalid_utf8() {
    let err = ingest("a.py", &[0x64, 0x65, 0x66, 0xff, 0xfe], &LimitsConfig::default()).unwrap_err();
    assert!(matches!(err, AnalysisError::InvalidEncoding(_)));
}
