use todo_store::application::controller::{Command, FilterResetPolicy, Outcome, TodoController};
use todo_store::application::todo_store::TodoStore;
use todo_store::domain::error::StoreError;
use todo_store::domain::filter::Filter;
use todo_store::domain::storage::KeyValueStorage;
use todo_store::domain::todo::TodoRecord;
use todo_store::infrastructure::sqlite_kv::SqliteKeyValueStore;

async fn sqlite() -> SqliteKeyValueStore {
    // use in-memory sqlite for tests
    let kv = SqliteKeyValueStore::connect("sqlite::memory:").await.unwrap();
    kv.init().await.unwrap();
    kv
}

#[tokio::test]
async fn acceptance_add_toggle_reload() {
    let kv = sqlite().await;
    let mut store = TodoStore::open(kv.clone()).await.unwrap();
    assert_eq!(store.add("buy milk").await.unwrap(), 0);
    assert_eq!(store.add("walk dog").await.unwrap(), 1);
    assert!(store.toggle(0).await.unwrap());

    assert_eq!(kv.get("todos").await.unwrap().as_deref(), Some(r#"["buy milk","walk dog"]"#));
    assert_eq!(kv.get("completed").await.unwrap().as_deref(), Some("[true,false]"));

    // simulate a page reload
    let reloaded = TodoStore::open(kv).await.unwrap();
    assert_eq!(reloaded.count(), 2);
    assert_eq!(
        reloaded.records(),
        vec![
            TodoRecord { text: "buy milk".into(), completed: true },
            TodoRecord { text: "walk dog".into(), completed: false },
        ]
    );
}

#[tokio::test]
async fn acceptance_remove_update_and_out_of_range() {
    let kv = sqlite().await;
    let mut store = TodoStore::open(kv.clone()).await.unwrap();
    for text in ["a", "b", "c"] {
        store.add(text).await.unwrap();
    }
    store.remove(1).await.unwrap();
    store.toggle(1).await.unwrap();
    store.update(1, "c2").await.unwrap();
    assert!(matches!(store.remove(5).await, Err(StoreError::OutOfRange { position: 5, len: 2 })));

    let reloaded = TodoStore::open(kv).await.unwrap();
    assert_eq!(reloaded.records(), vec![TodoRecord::new("a"), TodoRecord::new("c2")]);
}

#[tokio::test]
async fn acceptance_mismatched_lengths_truncate_on_load() {
    let kv = sqlite().await;
    kv.set_all(&[("todos", r#"["a","b"]"#.into()), ("completed", "[true]".into())]).await.unwrap();
    let store = TodoStore::open(kv).await.unwrap();
    assert_eq!(store.records(), vec![TodoRecord { text: "a".into(), completed: true }]);
}

#[tokio::test]
async fn acceptance_controller_session() {
    let store = TodoStore::open(sqlite().await).await.unwrap();
    let mut controller = TodoController::new(store, FilterResetPolicy::ResetToAll);

    assert_eq!(controller.dispatch(Command::Add("x".into())).await.unwrap(), Outcome::Added(0));
    assert_eq!(controller.dispatch(Command::Add("y".into())).await.unwrap(), Outcome::Added(1));
    controller.dispatch(Command::Toggle(0)).await.unwrap();
    controller.dispatch(Command::SetFilter(Filter::Completed)).await.unwrap();
    assert_eq!(controller.visible().len(), 1);

    controller.dispatch(Command::Edit(0)).await.unwrap();
    assert!(matches!(controller.dispatch(Command::Edit(1)).await, Err(StoreError::ConcurrentEditConflict { open: 0 })));
    controller.dispatch(Command::Save(0, "x2".into())).await.unwrap();

    assert_eq!(controller.filter(), Filter::All);
    assert_eq!(controller.store().get(0), Some(TodoRecord::new("x2")));
    controller.dispatch(Command::Delete(0)).await.unwrap();
    assert_eq!(controller.store().records(), vec![TodoRecord::new("y")]);
}
