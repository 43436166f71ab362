use std::fs;

use chrono::NaiveDate;
use filestack::{
    Catalog, Config, ErrorKind, Item, ItemDraft, ItemKind, ListQuery, Section, Site, Status, TrashDisposal,
};
use tempfile::TempDir;

fn site() -> (TempDir, Config) {
    let tmp = TempDir::new().unwrap();
    let config = Config {
        posts_dir: tmp.path().join("posts"),
        ..Config::default()
    };
    (tmp, config)
}

fn publish(catalog: &Catalog, config: &Config, original: &Item, name: &str, title: &str) -> Item {
    let draft = ItemDraft {
        title: title.to_string(),
        date: NaiveDate::from_ymd_opt(2012, 5, 6)
            .unwrap()
            .and_hms_opt(7, 8, 9)
            .unwrap(),
        status: Status::Visible,
        name: name.to_string(),
        categories: "Life".to_string(),
        tags: "rust, notes".to_string(),
        content: format!("<p>{}</p>", title),
        parent: None,
    };
    let item = Item::from_draft(draft, original, &config.posts_dir);
    catalog.replace(&original.name, &item).unwrap();
    item
}

#[test]
fn create_publish_and_rename() {
    let (_tmp, config) = site();
    let catalog = Catalog::open(&config).unwrap();
    let now = NaiveDate::from_ymd_opt(2012, 5, 6)
        .unwrap()
        .and_hms_opt(7, 8, 9)
        .unwrap();

    let created = catalog.create(ItemKind::Post, now).unwrap();
    assert_eq!(catalog.find(&created.name).unwrap().unwrap().status, Status::Hidden);

    let first = publish(&catalog, &config, &created, "a", "First");
    assert!(!created.filepath.exists());
    assert!(first.filepath.ends_with("20120506_a.xml"));

    let renamed = publish(&catalog, &config, &first, "b", "Second");
    assert!(!first.filepath.exists());
    assert!(renamed.filepath.exists());
    assert_eq!(catalog.find("a").unwrap(), None);
    assert_eq!(catalog.get("b").unwrap().url, "/2012/05/06/b/");
    assert!(catalog.verify().unwrap().is_empty());

    let view = Site::new(&config, &catalog);
    let context = view.list_context(&ListQuery::default()).unwrap();
    assert_eq!(context.posts.len(), 1);
    assert_eq!(context.posts[0].content, "<p>Second</p>");
    assert!(context.categories.contains("Life"));

    let tagged = ListQuery {
        tag: Some("notes".into()),
        ..Default::default()
    };
    assert_eq!(view.list_context(&tagged).unwrap().title, "Website Title - Tagged notes");
}

#[test]
fn trash_restore_and_empty() {
    let (tmp, config) = site();
    let catalog = Catalog::open(&config).unwrap();
    let now = NaiveDate::from_ymd_opt(2012, 5, 6)
        .unwrap()
        .and_hms_opt(7, 8, 9)
        .unwrap();
    let page = catalog.create(ItemKind::Page, now).unwrap();
    let page = publish(&catalog, &config, &page, "about", "About");

    catalog.set_trash("about", true).unwrap();
    let view = Site::new(&config, &catalog);
    assert!(view.menu(None).unwrap().is_empty());
    assert_eq!(
        view.detail_context(ItemKind::Page, "about", None).unwrap_err().kind(),
        ErrorKind::NotFound
    );

    catalog.set_trash("about", false).unwrap();
    assert_eq!(view.menu(None).unwrap()[0].slug, "about");
    assert_eq!(
        view.detail_context(ItemKind::Page, "about", None).unwrap().post.unwrap().content,
        "<p>About</p>"
    );

    catalog.set_trash("about", true).unwrap();
    let attic = tmp.path().join("attic");
    fs::create_dir(&attic).unwrap();
    let report = catalog.empty_trash(&TrashDisposal::MoveTo(attic.clone())).unwrap();
    assert_eq!(report.removed, ["about"]);
    assert!(attic.join("20120506_about.xml").exists());
    assert!(!page.filepath.exists());
    assert!(catalog.list(Section::Trash, None).unwrap().is_empty());
}
