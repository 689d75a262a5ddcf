//! end-to-end loading from real files
use optree::load::{FsLoader, Loader};
use optree::{node, MergePolicy, Value};
use pretty_assertions::assert_eq;
use std::fs;
use std::path::Path;

fn write(dir: &Path, name: &str, content: &str) {
    fs::write(dir.join(name), content).unwrap();
}

fn loader_in(dir: &Path) -> Loader<FsLoader> {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_env("OPTREE_LOG"))
        .with_writer(std::io::stderr)
        .try_init();

    Loader::new(FsLoader::new(vec![dir.to_path_buf()]))
}

#[test]
fn loads_sugar_text_with_blocks_and_references() {
    let dir = tempfile::tempdir().unwrap();
    write(
        dir.path(),
        "app.ot",
        "\
name = 'demo'
server:
  host = 'localhost'
  port = 8000
  url_port = _.port
",
    );

    let tree = loader_in(dir.path()).load(&["app"]).unwrap();
    assert_eq!(
        tree,
        node! {
            "name" => "demo",
            "server" => node! {
                "host" => "localhost",
                "port" => 8000,
                "url_port" => 8000,
            },
        }
    );
}

#[test]
fn probes_known_extensions() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "a.ot", "x = 1\n");
    write(dir.path(), "b.yml", "y: 2\n");
    write(dir.path(), "c.json", r#"{"z": 3}"#);

    let loader = loader_in(dir.path());
    assert_eq!(loader.load(&["a"]).unwrap(), node! { "x" => 1 });
    assert_eq!(loader.load(&["b"]).unwrap(), node! { "y" => 2 });
    assert_eq!(loader.load(&["c"]).unwrap(), node! { "z" => 3 });
}

#[test]
fn later_files_override_under_replace() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "base.ot", "a.b = 1\na.c = 'foo'\n");
    write(dir.path(), "site.ot", "a.b = 2\na.d = 'bar'\n");

    let tree = loader_in(dir.path()).load(&["base", "site"]).unwrap();
    assert_eq!(
        tree,
        node! { "a" => node! { "b" => 2, "c" => "foo", "d" => "bar" } }
    );
}

#[test]
fn earlier_files_keep_their_values_under_ignore() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "base.ot", "a.b = 1\na.c = 'foo'\n");
    write(dir.path(), "site.ot", "a.b = 2\na.d = 'bar'\n");

    let tree = loader_in(dir.path())
        .with_policy(MergePolicy::Ignore)
        .load(&["base", "site"])
        .unwrap();
    assert_eq!(
        tree,
        node! { "a" => node! { "b" => 1, "c" => "foo", "d" => "bar" } }
    );
}

#[test]
fn mixed_formats_merge_into_one_tree() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "defaults.yml", "db:\n  host: localhost\n  port: 5432\n");
    write(dir.path(), "local.ot", "db.port = 5433\n");

    let tree = loader_in(dir.path()).load(&["defaults", "local"]).unwrap();
    assert_eq!(
        tree,
        node! { "db" => node! { "host" => "localhost", "port" => 5433 } }
    );
}

#[test]
fn namespace_wraps_everything_loaded() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "rc.ot", "c.d = 1\ne.f = 2\n");

    let tree = loader_in(dir.path())
        .with_namespace("a.b")
        .load(&["rc"])
        .unwrap();
    assert_eq!(tree.fetch("a.b.c.d"), Some(Value::Integer(1)));
    assert_eq!(tree.fetch("a.b.e.f"), Some(Value::Integer(2)));
}

#[test]
fn missing_files_are_skipped_unless_strict() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "present.ot", "a = 1\n");

    let tree = loader_in(dir.path()).load(&["missing", "present"]).unwrap();
    assert_eq!(tree, node! { "a" => 1 });

    assert!(loader_in(dir.path()).strict().load(&["missing"]).is_err());
}

#[test]
fn absolute_paths_bypass_the_search_paths() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "abs.ot", "a = 1\n");
    let absolute = dir.path().join("abs.ot");

    let elsewhere = tempfile::tempdir().unwrap();
    let tree = loader_in(elsewhere.path())
        .load(&[absolute.to_str().unwrap()])
        .unwrap();
    assert_eq!(tree, node! { "a" => 1 });
}

#[test]
fn bad_content_surfaces_the_parse_error() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "broken.ot", "a:\n \tb = 1\n");

    assert!(loader_in(dir.path()).load(&["broken"]).is_err());
}
