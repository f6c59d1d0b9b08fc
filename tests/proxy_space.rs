//! End-to-end dispatch tests over a scripted in-memory RPC transport.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tupledb_client::{
    default_mapper, BaseOptions, CallResponse, ClientError, ClientResult, ParallelRoundRobinStrategy,
    PooledConnection, ProxyOperationsMapping, ProxySpace, RoundRobinStrategy, RpcClient,
    SelectOptions, SelectionConfig, SpaceMetadata, TupleUpdateOperations, Value,
};

/// Records every call and answers from a scripted queue.
struct ScriptedRpc {
    calls: Mutex<Vec<(String, Vec<Value>)>>,
    responses: Mutex<Vec<CallResponse>>,
}

impl ScriptedRpc {
    fn new(responses: Vec<CallResponse>) -> Arc<Self> {
        Arc::new(Self {
            calls: Mutex::new(Vec::new()),
            responses: Mutex::new(responses),
        })
    }

    fn calls(&self) -> Vec<(String, Vec<Value>)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl RpcClient for ScriptedRpc {
    async fn call(&self, procedure: &str, args: Vec<Value>) -> ClientResult<CallResponse> {
        self.calls
            .lock()
            .unwrap()
            .push((procedure.to_string(), args));
        let mut responses = self.responses.lock().unwrap();
        if responses.is_empty() {
            Ok(CallResponse::Ok(Value::Nil))
        } else {
            Ok(responses.remove(0))
        }
    }
}

fn books_space(rpc: Arc<ScriptedRpc>) -> ProxySpace {
    let connection = Arc::new(PooledConnection::new("127.0.0.1:3301", rpc));
    ProxySpace::new(
        Arc::new(SpaceMetadata::new(
            "books",
            ["id", "isbn", "title", "author", "year"],
        )),
        Arc::new(default_mapper()),
        Arc::new(RoundRobinStrategy::new(vec![connection])),
        ProxyOperationsMapping::default(),
    )
}

fn orwell_row() -> Value {
    Value::Array(vec![
        Value::from(4),
        Value::from("a4"),
        Value::from("Nineteen Eighty-Four"),
        Value::from("George Orwell"),
        Value::from(1984),
    ])
}

#[tokio::test]
async fn insert_sends_tuple_and_options_and_decodes_rows() {
    let rpc = ScriptedRpc::new(vec![CallResponse::Ok(Value::Map(vec![(
        Value::from("rows"),
        Value::Array(vec![orwell_row()]),
    )]))]);
    let space = books_space(Arc::clone(&rpc));

    let mut tuple = space.tuple();
    tuple.set(0, &4i64).unwrap();
    tuple.set_by_name("title", &"Nineteen Eighty-Four".to_string()).unwrap();

    let rows = space
        .insert(&tuple, &BaseOptions::new().with_timeout(1000).with_bucket_id(7))
        .await
        .unwrap();

    let calls = rpc.calls();
    assert_eq!(calls.len(), 1);
    let (procedure, args) = &calls[0];
    assert_eq!(procedure, "crud.insert");
    assert_eq!(args.len(), 3);
    assert_eq!(args[0], Value::from("books"));
    // Sparse positions between id and title were null-filled.
    assert_eq!(
        args[1],
        Value::Array(vec![
            Value::from(4),
            Value::Nil,
            Value::from("Nineteen Eighty-Four"),
        ])
    );
    assert_eq!(
        args[2],
        Value::Map(vec![
            (Value::from("timeout"), Value::from(1000u64)),
            (Value::from("bucket_id"), Value::from(7u64)),
        ])
    );

    assert_eq!(rows.len(), 1);
    assert_eq!(
        rows[0].get_by_name("author").map(|f| f.as_value()),
        Some(Value::from("George Orwell"))
    );
    assert_eq!(rows[0].get_decoded::<i64>(4).unwrap(), Some(1984));
}

#[tokio::test]
async fn update_lowers_operations_to_one_based_positions() {
    let rpc = ScriptedRpc::new(vec![CallResponse::Ok(Value::Array(vec![]))]);
    let space = books_space(Arc::clone(&rpc));

    let mut key = space.tuple();
    key.set(0, &4i64).unwrap();

    // Index 4 and the name "title" both lower to 1-based positions.
    let operations = TupleUpdateOperations::add(4, 1)
        .and_set("title", "Animal Farm")
        .unwrap();

    space
        .update(&key, &operations, &BaseOptions::new())
        .await
        .unwrap();

    let calls = rpc.calls();
    let (procedure, args) = &calls[0];
    assert_eq!(procedure, "crud.update");
    assert_eq!(args[1], Value::Array(vec![Value::from(4)]));
    assert_eq!(
        args[2],
        Value::Array(vec![
            Value::Array(vec![Value::from("+"), Value::from(5u64), Value::from(1)]),
            Value::Array(vec![
                Value::from("="),
                Value::from(3u64),
                Value::from("Animal Farm"),
            ]),
        ])
    );
}

#[tokio::test]
async fn upsert_from_tuple_snapshot() {
    let rpc = ScriptedRpc::new(vec![CallResponse::Ok(Value::Nil)]);
    let space = books_space(Arc::clone(&rpc));

    let mut tuple = space.tuple();
    tuple.set(0, &4i64).unwrap();
    tuple.set(4, &1984i64).unwrap();

    let operations = TupleUpdateOperations::from_tuple(&tuple).unwrap();
    space
        .upsert(&tuple, &operations, &BaseOptions::new())
        .await
        .unwrap();

    let calls = rpc.calls();
    let (procedure, args) = &calls[0];
    assert_eq!(procedure, "crud.upsert");
    // One set operation per field, in position order, 1-based.
    let lowered = args[2].as_array().unwrap();
    assert_eq!(lowered.len(), 5);
    for (i, op) in lowered.iter().enumerate() {
        let op = op.as_array().unwrap();
        assert_eq!(op[0], Value::from("="));
        assert_eq!(op[1], Value::from((i + 1) as u64));
    }
}

#[tokio::test]
async fn select_passes_pagination_options() {
    let rpc = ScriptedRpc::new(vec![CallResponse::Ok(Value::Array(vec![]))]);
    let space = books_space(Arc::clone(&rpc));

    let mut after = space.tuple();
    after.set(0, &4i64).unwrap();

    let rows = space
        .select(
            None,
            &SelectOptions::new().with_limit(50).with_batch_size(10).with_after(after),
        )
        .await
        .unwrap();
    assert!(rows.is_empty());

    let calls = rpc.calls();
    let (procedure, args) = &calls[0];
    assert_eq!(procedure, "crud.select");
    assert_eq!(args[1], Value::Nil);
    let options = args[2].as_map().unwrap();
    assert_eq!(options.len(), 3);
    assert_eq!(options[0], (Value::from("select_limit"), Value::from(50u64)));
    assert_eq!(
        options[2],
        (Value::from("select_after"), Value::Array(vec![Value::from(4)]))
    );
}

#[tokio::test]
async fn server_error_payload_surfaces_as_classified_failure() {
    let payload = Value::Map(vec![
        (Value::from("class_name"), Value::from("UpdateError")),
        (Value::from("err"), Value::from("Duplicate key exists")),
        (Value::from("str"), Value::from("UpdateError: Duplicate key exists")),
    ]);
    let rpc = ScriptedRpc::new(vec![CallResponse::Error(payload)]);
    let space = books_space(rpc);

    let mut key = space.tuple();
    key.set(0, &4i64).unwrap();

    let err = space.delete(&key, &BaseOptions::new()).await.unwrap_err();
    match err {
        ClientError::ModuleError {
            class_name,
            message,
        } => {
            assert_eq!(class_name.as_deref(), Some("UpdateError"));
            assert_eq!(message, "Duplicate key exists");
        }
        other => panic!("expected module error, got {:?}", other),
    }
}

#[tokio::test]
async fn dispatch_fails_fast_when_every_connection_is_dead() {
    let rpc = ScriptedRpc::new(vec![]);
    let connection = Arc::new(PooledConnection::new("127.0.0.1:3301", Arc::clone(&rpc) as Arc<dyn RpcClient>));
    connection.set_connected(false);

    let space = ProxySpace::new(
        Arc::new(SpaceMetadata::new("books", ["id"])),
        Arc::new(default_mapper()),
        Arc::new(ParallelRoundRobinStrategy::new(
            &SelectionConfig::default(),
            vec![connection],
        )),
        ProxyOperationsMapping::default(),
    );

    let err = space
        .select(None, &SelectOptions::new())
        .await
        .unwrap_err();
    assert!(matches!(err, ClientError::NoAvailableConnections));
    assert!(rpc.calls().is_empty());
}
