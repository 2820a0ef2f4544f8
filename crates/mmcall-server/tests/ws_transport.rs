#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

mod common;

use std::net::SocketAddr;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use serde_json::{json, Value};
use tokio_tungstenite::tungstenite::Message;

use mmcall_core::error::{MmError, Result};
use mmcall_core::protocol::Envelope;
use mmcall_server::registry::{handler, MethodSpec, Resource};
use mmcall_server::router::build_router;
use mmcall_server::services::math;
use mmcall_server::transport::NativeRequest;

use common::{state, CONFIG};

type Client = tokio_tungstenite::WebSocketStream<tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>>;

fn clock() -> Resource {
    Resource::new("clock").method("sleep", |_| {
        Ok(MethodSpec::new()
            .request(json!({ "type": "integer", "minimum": 0 }))
            .handler(handler(|ctx| async move {
                let ms: u64 = ctx.payload_as()?;
                tokio::time::sleep(Duration::from_millis(ms)).await;
                Ok(ms)
            })))
    })
}

fn stream() -> Resource {
    Resource::new("stream").method("count", |_| {
        Ok(MethodSpec::new().raw().handler(handler(|ctx| async move {
            let Some(NativeRequest::Socket(sock)) = ctx.native else {
                return Err(MmError::call("socket only"));
            };
            if sock.url() != "/api/v1" {
                return Err(MmError::call(format!("unexpected url {}", sock.url())));
            }
            let n = ctx.payload.as_ref().and_then(Value::as_u64).unwrap_or(0);
            for i in 0..n {
                sock.push(&Envelope::request("stream.tick", Some(json!(i)))).await?;
            }
            Result::Ok("done")
        })))
    })
}

async fn serve() -> SocketAddr {
    let app = build_router(state(CONFIG, vec![math::resource(), clock(), stream()]));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

async fn connect(addr: SocketAddr) -> Client {
    let (ws, _) = tokio_tungstenite::connect_async(format!("ws://{addr}/api/v1")).await.unwrap();
    ws
}

async fn next_frame(ws: &mut Client) -> Value {
    loop {
        let msg = tokio::time::timeout(Duration::from_secs(5), ws.next())
            .await
            .expect("reply in time")
            .expect("stream open")
            .unwrap();
        match msg {
            Message::Text(t) => return serde_json::from_str(&t).unwrap(),
            Message::Ping(_) | Message::Pong(_) => continue,
            other => panic!("unexpected message: {other:?}"),
        }
    }
}

#[tokio::test]
async fn call_over_socket() {
    let addr = serve().await;
    let mut ws = connect(addr).await;

    ws.send(Message::Text(r#"["math.add",[2,3],"",1]"#.into())).await.unwrap();
    assert_eq!(next_frame(&mut ws).await, json!(["", 5, "", 1]));

    ws.send(Message::Text(r#"["math.nope",null,"",2]"#.into())).await.unwrap();
    let frame = next_frame(&mut ws).await;
    assert_eq!(frame[0]["code"], json!(4400));
    assert_eq!(frame[3], json!(2));
}

#[tokio::test]
async fn slow_call_does_not_block_fast_one() {
    let addr = serve().await;
    let mut ws = connect(addr).await;

    ws.send(Message::Text(r#"["clock.sleep",400,"","slow"]"#.into())).await.unwrap();
    ws.send(Message::Text(r#"["clock.sleep",0,"","fast"]"#.into())).await.unwrap();

    let first = next_frame(&mut ws).await;
    let second = next_frame(&mut ws).await;
    assert_eq!(first, json!(["", 0, "", "fast"]));
    assert_eq!(second, json!(["", 400, "", "slow"]));
}

#[tokio::test]
async fn binary_frames_and_garbage() {
    let addr = serve().await;
    let mut ws = connect(addr).await;

    ws.send(Message::Binary(br#"["math.add",[1,2],"",3]"#.to_vec())).await.unwrap();
    assert_eq!(next_frame(&mut ws).await, json!(["", 3, "", 3]));

    ws.send(Message::Binary(vec![0xff, 0xfe])).await.unwrap();
    assert_eq!(next_frame(&mut ws).await[0]["code"], json!(4230));

    ws.send(Message::Text("{not json".into())).await.unwrap();
    assert_eq!(next_frame(&mut ws).await[0]["code"], json!(4230));
}

#[tokio::test]
async fn error_frames_from_client_are_dropped() {
    let addr = serve().await;
    let mut ws = connect(addr).await;

    ws.send(Message::Text(r#"[{"code":4000,"message":"Error"},null,"",1]"#.into())).await.unwrap();
    ws.send(Message::Text(r#"["math.add",[1,1],"",2]"#.into())).await.unwrap();

    assert_eq!(next_frame(&mut ws).await, json!(["", 2, "", 2]));
}

#[tokio::test]
async fn client_acknowledgements_get_no_reply() {
    let addr = serve().await;
    let mut ws = connect(addr).await;

    // a client answering a pushed frame must not start a reply loop
    ws.send(Message::Text(r#"["",5,"",1]"#.into())).await.unwrap();
    ws.send(Message::Text(r#"["",null]"#.into())).await.unwrap();
    ws.send(Message::Text(r#"["math.add",[2,2],"",3]"#.into())).await.unwrap();

    assert_eq!(next_frame(&mut ws).await, json!(["", 4, "", 3]));
}

#[tokio::test]
async fn raw_socket_endpoint_streams_frames() {
    let addr = serve().await;
    let mut ws = connect(addr).await;

    ws.send(Message::Text(r#"["stream.count",2,"",5]"#.into())).await.unwrap();
    assert_eq!(next_frame(&mut ws).await, json!(["stream.tick", 0]));
    assert_eq!(next_frame(&mut ws).await, json!(["stream.tick", 1]));
    assert_eq!(next_frame(&mut ws).await, json!(["", "done", "", 5]));
}
