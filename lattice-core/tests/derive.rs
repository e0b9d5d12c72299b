//! Integration tests for types bound with `#[derive(Bind)]`.

#![cfg(feature = "derive")]

use chrono::NaiveDate;
use lattice_core::{Bind, Binder, Error, Format, Repr, Role};

#[derive(Debug, Clone, PartialEq, Bind)]
enum Genre {
    Fiction,
    #[bind(rename = "non-fiction")]
    NonFiction,
}

#[derive(Debug, Clone, PartialEq, Bind)]
#[bind(root = "book")]
struct Book {
    #[bind(attribute)]
    title: String,
    #[bind(attribute)]
    pages: u32,
    #[bind(attribute)]
    genre: Genre,
    published: Option<NaiveDate>,
    #[bind(collection, rename = "author")]
    authors: Vec<String>,
    #[bind(skip)]
    cached: usize,
}

#[derive(Debug, PartialEq, Bind)]
struct Chain {
    #[bind(attribute)]
    n: i32,
    next: Option<Box<Chain>>,
}

#[derive(Debug, PartialEq, Bind)]
#[bind(rename = "note")]
struct Note {
    #[bind(attribute, optional)]
    lang: String,
    #[bind(text)]
    body: String,
}

#[derive(Debug, PartialEq, Bind)]
struct Shelf {
    #[bind(entry = "slot")]
    books: Vec<Book>,
}

fn compact() -> Binder {
    Binder::with_format(Format::new(0)).unwrap()
}

fn dune() -> Book {
    Book {
        title: "Dune".to_string(),
        pages: 412,
        genre: Genre::Fiction,
        published: NaiveDate::from_ymd_opt(1965, 8, 1),
        authors: vec!["Frank Herbert".to_string()],
        cached: 0,
    }
}

#[test]
fn derived_class_describes_fields() {
    let class = Book::class();
    assert_eq!(class.name(), "Book");
    assert_eq!(class.root_name(), "book");

    let fields = class.fields();
    let names: Vec<_> = fields.iter().map(|f| f.name()).collect();
    assert_eq!(names, vec!["title", "pages", "genre", "published", "author"]);

    let published = class.field("published").unwrap();
    assert!(!published.is_required());
    assert_eq!(published.role(), Role::Element);
    assert_eq!(class.field("author").unwrap().role(), Role::Collection);
    assert!(matches!(Genre::class().repr(), Repr::Enum(variants) if variants == &["Fiction", "non-fiction"]));
}

#[test]
fn typed_round_trip() {
    let binder = compact();
    let xml = binder.encode(&dune()).unwrap();
    assert_eq!(
        xml,
        concat!(
            r#"<book id="0" title="Dune" pages="412" genre="Fiction">"#,
            "<published>1965-08-01</published>",
            "<author>Frank Herbert</author>",
            "</book>"
        )
    );
    assert_eq!(binder.decode::<Book>(&xml).unwrap(), dune());
}

#[test]
fn renamed_variant_and_empty_collection() {
    let book = Book {
        genre: Genre::NonFiction,
        published: None,
        authors: Vec::new(),
        ..dune()
    };
    let binder = compact();
    let xml = binder.encode(&book).unwrap();
    assert_eq!(xml, r#"<book id="0" title="Dune" pages="412" genre="non-fiction"/>"#);
    assert_eq!(binder.decode::<Book>(&xml).unwrap(), book);
}

#[test]
fn unknown_variant_is_invalid() {
    let xml = r#"<book id="0" title="Dune" pages="412" genre="Poetry"/>"#;
    let err = compact().decode::<Book>(xml).unwrap_err();
    assert!(matches!(err, Error::InvalidValue { ref text, .. } if text == "Poetry"));
}

#[test]
fn recursive_type() {
    let chain = Chain {
        n: 1,
        next: Some(Box::new(Chain {
            n: 2,
            next: Some(Box::new(Chain { n: 3, next: None })),
        })),
    };
    let binder = compact();
    let xml = binder.encode(&chain).unwrap();
    assert_eq!(
        xml,
        r#"<Chain id="0" n="1"><next id="1" n="2"><next id="2" n="3"/></next></Chain>"#
    );
    assert_eq!(binder.decode::<Chain>(&xml).unwrap(), chain);
}

#[test]
fn text_content() {
    let note = Note {
        lang: "en".to_string(),
        body: "fish & chips".to_string(),
    };
    let binder = compact();
    let xml = binder.encode(&note).unwrap();
    assert_eq!(xml, r#"<note id="0" lang="en">fish &amp; chips</note>"#);
    assert_eq!(binder.decode::<Note>(&xml).unwrap(), note);
}

#[test]
fn absent_optional_field_reads_as_default() {
    let note = compact().decode::<Note>(r#"<note id="0">hi</note>"#).unwrap();
    assert_eq!(
        note,
        Note {
            lang: String::new(),
            body: "hi".to_string(),
        }
    );
}

#[test]
fn empty_author_round_trips() {
    let book = Book {
        authors: vec![String::new(), "Frank Herbert".to_string()],
        ..dune()
    };
    let binder = compact();
    let xml = binder.encode(&book).unwrap();
    assert!(xml.contains("<author><![CDATA[]]></author>"));
    assert_eq!(binder.decode::<Book>(&xml).unwrap(), book);
}

#[test]
fn nested_vectors_keep_their_boundaries() {
    let rows = vec![vec![1, 2], vec![3], Vec::new()];
    let binder = compact();
    let xml = binder.encode(&rows).unwrap();
    assert_eq!(
        xml,
        r#"<array length="3" id="0"><entry>1, 2</entry><entry>3</entry><entry><![CDATA[]]></entry></array>"#
    );
    assert_eq!(binder.decode::<Vec<Vec<i32>>>(&xml).unwrap(), rows);
}

#[test]
fn array_entries_use_custom_name() {
    let shelf = Shelf { books: vec![dune()] };
    let binder = compact();
    let xml = binder.encode(&shelf).unwrap();
    assert!(xml.starts_with(r#"<Shelf id="0"><books id="1" length="1"><slot id="2" title="Dune""#));
    assert_eq!(binder.decode::<Shelf>(&xml).unwrap(), shelf);
}
