use super::{HeaderTable, contains_ignore_case, standard};

const fn is_send_sync<T: Send + Sync>() { }
const _: () = {
    is_send_sync::<HeaderTable>();
};

#[test]
fn test_append_get() {
    let mut table = HeaderTable::new();
    assert!(table.is_empty());

    table.append("Content-Type", "text/plain");
    table.append("Accept", "text/html");
    table.append("accept", "application/json");

    assert_eq!(table.len(), 3);
    assert_eq!(table.get("content-type"), Some("text/plain"));
    assert_eq!(table.get("CONTENT-TYPE"), Some("text/plain"));
    assert_eq!(table.get_all("ACCEPT"), ["text/html", "application/json"]);
    assert!(table.contains("accept"));
    assert!(!table.contains("host"));
    assert_eq!(table.get("host"), None);
    assert!(table.get_all("host").is_empty());
}

#[test]
fn test_insert_replaces() {
    let mut table = HeaderTable::new();
    table.append("Set-Cookie", "a=1");
    table.append("Set-Cookie", "b=2");

    let previous = table.insert("set-cookie", "c=3").unwrap();
    assert_eq!(previous, ["a=1", "b=2"]);
    assert_eq!(table.get_all("Set-Cookie"), ["c=3"]);
    assert_eq!(table.len(), 1);

    assert!(table.insert(standard::CONTENT_LENGTH, "0").is_none());
    assert_eq!(table.len(), 2);
}

#[test]
fn test_remove_keeps_order() {
    let mut table = HeaderTable::new();
    table.append("Host", "example.com");
    table.append("Accept", "*/*");
    table.append("Connection", "close");

    assert_eq!(table.remove("ACCEPT").unwrap(), ["*/*"]);
    assert!(table.remove("accept").is_none());
    assert_eq!(table.len(), 2);
    assert_eq!(table.get("connection"), Some("close"));

    let pairs: Vec<_> = table.iter().collect();
    assert_eq!(pairs, [("Host", "example.com"), ("Connection", "close")]);
}

#[test]
fn test_iter_keeps_first_casing() {
    let mut table = HeaderTable::new();
    table.append("X-Trace", "1");
    table.append("x-trace", "2");

    let pairs: Vec<_> = table.iter().collect();
    assert_eq!(pairs, [("X-Trace", "1"), ("X-Trace", "2")]);

    table.clear();
    assert!(table.is_empty());
    assert_eq!(table.iter().count(), 0);
}

#[test]
fn test_tokens() {
    let mut table = HeaderTable::new();
    table.append("Connection", "Keep-Alive, Upgrade");

    assert!(table.has_token("connection", "keep-alive"));
    assert!(table.has_token("connection", "upgrade"));
    assert!(!table.has_token("connection", "close"));
    assert!(table.contains_ignore_case("connection", "ALIVE"));

    assert!(contains_ignore_case("not-Close", "close"));
    assert!(!contains_ignore_case("clos", "close"));
}
