use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use pretty_assertions::assert_eq;
use quire::config::ConfigOverrides;
use quire::validate::ValidationError;
use quire::{BuildError, Site};
use walkdir::WalkDir;

fn site_root() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("../../site")
}

fn build_into(out_dir: &Path) -> PathBuf {
    let overrides = ConfigOverrides {
        out_dir: Some(out_dir.to_owned()),
        ..Default::default()
    };

    Site::load(site_root(), "quire.toml", overrides)
        .unwrap()
        .build()
        .unwrap()
}

fn read_bundle(root: &Path) -> BTreeMap<String, Vec<u8>> {
    WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .map(|entry| entry.unwrap())
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| {
            let relative = entry
                .path()
                .strip_prefix(root)
                .unwrap()
                .to_string_lossy()
                .replace('\\', "/");

            (relative, fs::read(entry.path()).unwrap())
        })
        .collect()
}

#[test]
fn test_guide_builds() {
    let dir = tempfile::tempdir().unwrap();
    let bundle = read_bundle(&build_into(&dir.path().join("dist")));

    let mut paths = bundle.keys().map(String::as_str).collect::<Vec<_>>();
    paths.sort();

    assert_eq!(
        paths,
        vec![
            "404.html",
            "assets/custom.css",
            "assets/style.css",
            "guide/01-introduction.html",
            "guide/02-project-setup.html",
            "guide/03-components-and-props.html",
            "guide/04-state-with-usestate.html",
            "guide/05-effects-with-useeffect.html",
            "guide/06-fetching-listings.html",
            "guide/07-routing.html",
            "guide/08-search-and-filters.html",
            "guide/09-deployment.html",
            "images/logo.svg",
            "index.html",
            "sitemap.xml",
        ]
    );
}

#[test]
fn test_builds_are_deterministic() {
    let first = tempfile::tempdir().unwrap();
    let second = tempfile::tempdir().unwrap();

    let first = read_bundle(&build_into(&first.path().join("dist")));
    let second = read_bundle(&build_into(&second.path().join("dist")));

    assert_eq!(first.keys().collect::<Vec<_>>(), second.keys().collect::<Vec<_>>());
    for (path, contents) in &first {
        assert!(&second[path] == contents, "'{path}' differs between builds");
    }
}

#[test]
fn test_navigation_is_rendered_in_declared_order() {
    let site = Site::load(site_root(), "quire.toml", ConfigOverrides::default()).unwrap();

    let labels = site
        .navigation()
        .nav
        .iter()
        .map(|entry| entry.label.as_str())
        .collect::<Vec<_>>();
    assert_eq!(
        labels,
        vec![
            "Home",
            "Introduction",
            "Setup",
            "Components",
            "State",
            "Effects",
            "Fetching",
            "Routing",
            "Deploy",
        ]
    );

    let dir = tempfile::tempdir().unwrap();
    let bundle = read_bundle(&build_into(&dir.path().join("dist")));
    let page = String::from_utf8(bundle["guide/07-routing.html"].clone()).unwrap();

    let positions = labels
        .iter()
        .map(|label| {
            page.find(&format!(">{label}</a>"))
                .unwrap_or_else(|| panic!("'{label}' is not in the page"))
        })
        .collect::<Vec<_>>();
    let mut sorted = positions.clone();
    sorted.sort();
    assert_eq!(positions, sorted);
}

#[test]
fn test_broken_link_fails_before_output_is_written() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();

    fs::create_dir_all(root.join("docs/guide")).unwrap();
    fs::write(root.join("docs/index.md"), "# Home\n").unwrap();
    fs::write(root.join("docs/guide/01-introduction.md"), "# Introduction\n").unwrap();
    fs::write(
        root.join("quire.toml"),
        concat!(
            "title = \"Airbnb Clone\"\n",
            "base = \"/airbnb-clone/\"\n",
            "\n",
            "[[nav]]\n",
            "text = \"Introduction\"\n",
            "link = \"./guide/01-introduction.md\"\n",
            "\n",
            "[[nav]]\n",
            "text = \"Missing\"\n",
            "link = \"./guide/10-missing.md\"\n",
        ),
    )
    .unwrap();

    let error = Site::load(root, "quire.toml", ConfigOverrides::default()).unwrap_err();

    match error {
        BuildError::Validation(ValidationError::BrokenLink { label, link }) => {
            assert_eq!(label, "Missing");
            assert_eq!(link, "./guide/10-missing.md");
        }
        error => panic!("unexpected error: {error}"),
    }
    assert!(!root.join("dist").exists());
}

#[test]
fn test_invalid_base_path_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();

    fs::create_dir_all(root.join("docs")).unwrap();
    fs::write(root.join("docs/index.md"), "# Home\n").unwrap();
    fs::write(
        root.join("quire.toml"),
        "title = \"Airbnb Clone\"\nbase = \"my-repo\"\n",
    )
    .unwrap();

    let error = Site::load(root, "quire.toml", ConfigOverrides::default()).unwrap_err();

    assert!(matches!(
        error,
        BuildError::Validation(ValidationError::InvalidBasePath(_))
    ));
    assert!(!root.join("dist").exists());
}
