use persistence::{JsonFileStore, PersistConfig, PersistenceError, Session};
use planner_core::{
    Catalog, Expansion, Ingredient, Item, ItemId, Operator, OperatorGoal, OperatorGoalType,
    OperatorId, UpgradeCost,
};
use planner_state::{Action, Reconciliation, STATE_VERSION};
use std::sync::Arc;

const AMIYA: &str = "char_002_amiya";

fn catalog() -> Arc<Catalog> {
    let item = |id: &str, tier: u8, ingredients: Vec<Ingredient>| Item {
        id: ItemId::from(id),
        name: id.to_string(),
        tier,
        yield_count: (!ingredients.is_empty()).then_some(1),
        ingredients,
    };
    let op = Operator {
        id: OperatorId::from(AMIYA),
        name: "Amiya".to_string(),
        rarity: 5,
        elite: vec![
            UpgradeCost {
                ingredients: vec![Ingredient::new("30012", 5)],
            },
            UpgradeCost {
                ingredients: vec![Ingredient::new("30013", 2)],
            },
        ],
        skills: vec![],
        skill_levels: vec![],
    };
    Arc::new(
        Catalog::new(
            vec![op],
            vec![
                item("30012", 2, vec![]),
                item("30013", 3, vec![Ingredient::new("30012", 3)]),
            ],
        )
        .unwrap(),
    )
}

fn id(s: &str) -> ItemId {
    ItemId::from(s)
}

#[tokio::test]
async fn state_survives_close_and_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("planner.json");

    let mut session =
        Session::open(catalog(), JsonFileStore::new(&path), PersistConfig::default()).unwrap();
    session
        .dispatch(Action::AddGoals(vec![
            OperatorGoal::new(AMIYA, OperatorGoalType::Elite1),
            OperatorGoal::new(AMIYA, OperatorGoalType::Elite2),
        ]))
        .unwrap();
    session
        .dispatch(Action::SetItemQuantity {
            item_id: id("30012"),
            quantity: 11,
        })
        .unwrap();
    session.dispatch(Action::ToggleItemCrafting(id("30013"))).unwrap();
    session.craft_item(&id("30013")).unwrap();
    assert!(session
        .complete_goal(&OperatorGoal::new(AMIYA, OperatorGoalType::Elite1))
        .unwrap());
    let stats = session.close().await.unwrap();
    assert_eq!(stats.failed, 0);
    assert!(stats.written >= 1);

    let session =
        Session::open(catalog(), JsonFileStore::new(&path), PersistConfig::default()).unwrap();
    let planner = session.planner();
    assert_eq!(planner.goals().len(), 1);
    assert_eq!(planner.goals().entries()[0].goal, OperatorGoalType::Elite2);
    // 11 - 3 (craft) - 5 (Elite 1) = 3
    assert_eq!(planner.depot().quantity(&id("30012")), 3);
    assert_eq!(planner.depot().quantity(&id("30013")), 1);

    let needed = planner.needed(Expansion::SingleLevel).unwrap();
    assert_eq!(needed[&id("30013")], 2);
    assert_eq!(needed[&id("30012")], 6);
    session.close().await.unwrap();
}

#[tokio::test]
async fn failed_dispatch_schedules_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("planner.json");
    let mut session =
        Session::open(catalog(), JsonFileStore::new(&path), PersistConfig::default()).unwrap();
    let err = session
        .dispatch(Action::IncrementItemQuantity(id("missing")))
        .unwrap_err();
    assert!(matches!(err, PersistenceError::State(_)));
    let stats = session.close().await.unwrap();
    assert_eq!(stats.written, 0);
    assert!(!path.exists());
}

#[tokio::test]
async fn remote_profile_replaces_and_persists() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("planner.json");
    let mut session =
        Session::open(catalog(), JsonFileStore::new(&path), PersistConfig::default()).unwrap();
    session
        .dispatch(Action::AddGoals(vec![OperatorGoal::new(AMIYA, OperatorGoalType::Elite1)]))
        .unwrap();

    let remote = planner_state::RemoteProfile::from_json(&format!(
        r#"{{"goals":{{"operators":[{{"operatorId":"{AMIYA}","goal":1,"focused":true}}]}},
            "depot":{{"quantities":{{"30013":4}},"itemsBeingCrafted":[]}},
            "version":{STATE_VERSION}}}"#
    ))
    .unwrap();
    assert_eq!(
        session.apply_remote(remote).unwrap(),
        Reconciliation::AcceptedRemote
    );
    session.close().await.unwrap();

    let snapshot = JsonFileStore::new(&path).load().unwrap().unwrap();
    assert_eq!(snapshot.schema_version, STATE_VERSION);
    assert_eq!(snapshot.goals.len(), 1);
    assert!(snapshot.goals.entries()[0].focused);
    assert_eq!(snapshot.depot.quantity(&id("30013")), 4);
}
