//! WebSocket transport against an in-process device.

use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use serde_json::json;
use shelly_rpc::protocol::{INVALID_ARGUMENT, METHOD_NOT_FOUND};
use shelly_rpc::{
    CallContext, ClientConfig, Error, Notification, Request, Response, RpcClient, RpcError,
    Switch, Transport, TransportError, WsTransport,
};
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;

/// What the fake device does with the requests it receives
#[derive(Clone, Copy)]
enum Behaviour {
    /// Collect `n` requests, push a notification, then answer in reverse order
    ReverseAfter(usize),
    /// Read requests and never answer
    Silent,
    /// Close the socket after the first request
    HangUp,
}

fn answer(request: &Request) -> String {
    let response = match request.method.as_str() {
        "Switch.Set" => Response::error(request.id.clone(), RpcError::new(INVALID_ARGUMENT, "busy")),
        "Sys.Nonexistent" => Response::error(
            request.id.clone(),
            RpcError::new(METHOD_NOT_FOUND, "No handler for Sys.Nonexistent"),
        ),
        "Switch.GetStatus" => Response::success(
            request.id.clone(),
            json!({"id": 0, "source": "WS_in", "output": true}),
        ),
        _ => Response::success(request.id.clone(), json!({ "method": request.method })),
    };
    serde_json::to_string(&response).unwrap()
}

async fn spawn_device(behaviour: Behaviour) -> (String, JoinHandle<Vec<Request>>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let address = listener.local_addr().unwrap().to_string();

    let handle = tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let mut ws = tokio_tungstenite::accept_async(stream).await.unwrap();
        let mut received = Vec::new();

        while let Some(Ok(message)) = ws.next().await {
            let Message::Text(text) = message else {
                continue;
            };
            let request: Request = serde_json::from_str(text.as_str()).unwrap();
            received.push(request);

            match behaviour {
                Behaviour::ReverseAfter(n) if received.len() == n => {
                    let notification = Notification {
                        src: Some("shellyplus1-441793ab3c70".to_string()),
                        dst: received[0].src.clone(),
                        method: "NotifyStatus".to_string(),
                        params: Some(json!({"ts": 1.0, "switch:0": {"output": true}})),
                    };
                    let text = serde_json::to_string(&notification).unwrap();
                    ws.send(Message::text(text)).await.unwrap();

                    for request in received.iter().rev() {
                        ws.send(Message::text(answer(request))).await.unwrap();
                    }
                }
                Behaviour::HangUp => {
                    let _ = ws.close(None).await;
                    break;
                }
                _ => {}
            }
        }

        received
    });

    (address, handle)
}

#[tokio::test]
async fn test_replies_correlated_out_of_order() {
    let (address, device) = spawn_device(Behaviour::ReverseAfter(3)).await;

    let ctx = CallContext::new();
    let transport = Arc::new(WsTransport::connect(&ctx, &address).await.unwrap());
    let mut notifications = transport.subscribe();
    let client = RpcClient::from_shared(transport.clone()).with_source("ws-test");

    let (a, b, c) = tokio::join!(
        client.call(&ctx, "Sys.GetStatus", None),
        client.call(&ctx, "Wifi.GetStatus", None),
        client.call(&ctx, "Cloud.GetStatus", None),
    );

    assert_eq!(a.unwrap().get(), r#"{"method":"Sys.GetStatus"}"#);
    assert_eq!(b.unwrap().get(), r#"{"method":"Wifi.GetStatus"}"#);
    assert_eq!(c.unwrap().get(), r#"{"method":"Cloud.GetStatus"}"#);
    assert_eq!(transport.in_flight(), 0);

    let notification = notifications.recv().await.unwrap();
    assert_eq!(notification.method, "NotifyStatus");
    assert_eq!(notification.dst.as_deref(), Some("ws-test"));

    client.close().await.unwrap();
    let received = device.await.unwrap();
    assert_eq!(received.len(), 3);
    assert!(received.iter().all(|r| r.src.as_deref() == Some("ws-test")));
}

#[tokio::test]
async fn test_clients_sharing_one_transport() {
    let (address, device) = spawn_device(Behaviour::ReverseAfter(3)).await;

    let ctx = CallContext::new();
    let transport = Arc::new(WsTransport::connect(&ctx, &address).await.unwrap());
    let first = RpcClient::from_shared(transport.clone()).with_source("first");
    let second = RpcClient::from_shared(transport.clone()).with_source("second");

    // Both clients number their requests from 1
    let (a, b, c) = tokio::join!(
        first.call(&ctx, "Sys.GetStatus", None),
        second.call(&ctx, "Wifi.GetStatus", None),
        second.call(&ctx, "Sys.Nonexistent", None),
    );

    assert_eq!(a.unwrap().get(), r#"{"method":"Sys.GetStatus"}"#);
    assert_eq!(b.unwrap().get(), r#"{"method":"Wifi.GetStatus"}"#);
    assert_eq!(c.unwrap_err().rpc_code(), Some(METHOD_NOT_FOUND));
    assert_eq!(transport.in_flight(), 0);

    transport.close().await.unwrap();
    let received = device.await.unwrap();
    let mut wire_ids: Vec<String> = received.iter().map(|r| r.id.to_string()).collect();
    wire_ids.sort();
    wire_ids.dedup();
    assert_eq!(wire_ids.len(), 3, "every request on the socket has its own id");
}

#[tokio::test]
async fn test_typed_accessor_and_error_over_ws() {
    let (address, device) = spawn_device(Behaviour::ReverseAfter(2)).await;

    let ctx = CallContext::new();
    let client = Arc::new(
        RpcClient::websocket(&ctx, &address, &ClientConfig::default())
            .await
            .unwrap(),
    );
    let switch = Switch::new(client.clone(), 0);

    let (status, set) = tokio::join!(switch.get_status(&ctx), switch.set(&ctx, false, None));
    assert_eq!(status.unwrap().output, Some(true));
    assert_eq!(set.unwrap_err().rpc_code(), Some(-103));

    client.close().await.unwrap();
    device.await.unwrap();
}

#[tokio::test]
async fn test_cancelled_call_leaves_no_pending_entry() {
    let (address, _device) = spawn_device(Behaviour::Silent).await;

    let transport = WsTransport::connect(&CallContext::new(), &address)
        .await
        .unwrap();
    let ctx = CallContext::new().with_timeout(Duration::from_millis(50));
    let request = Request::new("Sys.GetStatus", None, 1.into());

    let result = transport.call(&ctx, &request).await;
    assert!(matches!(result, Err(TransportError::DeadlineExceeded)));
    assert_eq!(transport.in_flight(), 0);
}

#[tokio::test]
async fn test_close_fails_in_flight_and_later_calls() {
    let (address, _device) = spawn_device(Behaviour::Silent).await;

    let transport = Arc::new(
        WsTransport::connect(&CallContext::new(), &address)
            .await
            .unwrap(),
    );

    let (started_tx, started_rx) = oneshot::channel();
    let in_flight = {
        let transport = transport.clone();
        tokio::spawn(async move {
            let request = Request::new("Sys.GetStatus", None, 7.into());
            let ctx = CallContext::new();
            let call = transport.call(&ctx, &request);
            let _ = started_tx.send(());
            call.await
        })
    };
    started_rx.await.unwrap();
    while transport.in_flight() == 0 {
        tokio::task::yield_now().await;
    }

    transport.close().await.unwrap();
    transport.close().await.unwrap();

    let result = in_flight.await.unwrap();
    assert!(matches!(result, Err(TransportError::Closed)));

    let request = Request::new("Sys.GetStatus", None, 8.into());
    let result = transport.call(&CallContext::new(), &request).await;
    assert!(matches!(result, Err(TransportError::Closed)));
}

#[tokio::test]
async fn test_device_hang_up_fails_pending_call() {
    let (address, device) = spawn_device(Behaviour::HangUp).await;

    let ctx = CallContext::new().with_timeout(Duration::from_secs(5));
    let client = RpcClient::websocket(&ctx, &address, &ClientConfig::default())
        .await
        .unwrap();

    let err = client.call(&ctx, "Sys.GetStatus", None).await.unwrap_err();
    assert!(
        matches!(
            err,
            Error::Transport(TransportError::ConnectionLost(_) | TransportError::Closed)
        ),
        "got {err:?}"
    );
    device.await.unwrap();

    let err = client.call(&ctx, "Sys.GetStatus", None).await.unwrap_err();
    assert!(matches!(err, Error::Transport(TransportError::Closed)));
}

#[tokio::test]
async fn test_tls_address_rejected() {
    let err = RpcClient::websocket(&CallContext::new(), "wss://10.0.0.9", &ClientConfig::default())
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Transport(TransportError::InvalidAddress(_))));
}

#[tokio::test]
async fn test_connection_refused() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let address = listener.local_addr().unwrap().to_string();
    drop(listener);

    let result = WsTransport::connect(&CallContext::new(), &address).await;
    assert!(matches!(result, Err(TransportError::WebSocket(_))));
}
