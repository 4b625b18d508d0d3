use crate::workflow::command::Command;
use crate::workflow::runner::SharedStatus;
use log::{error, info, warn};
use serde::Deserialize;
use serde_json::json;
use std::{convert::Infallible, net::SocketAddr, thread};
use tokio::runtime::Builder;
use tokio::sync::mpsc::UnboundedSender;
use trackcore::wire::decode_hex;
use warp::{http::StatusCode, Filter, Rejection, Reply};

#[derive(Debug, Deserialize)]
struct TextBody {
    text: String,
}

type CommandSender = UnboundedSender<Command>;

fn queue(commands: &CommandSender, command: Command) -> warp::reply::WithStatus<warp::reply::Json> {
    match commands.send(command) {
        Ok(()) => warp::reply::with_status(
            warp::reply::json(&json!({"status": "queued"})),
            StatusCode::ACCEPTED,
        ),
        Err(_) => warp::reply::with_status(
            warp::reply::json(&json!({"status": "error", "reason": "runner stopped"})),
            StatusCode::SERVICE_UNAVAILABLE,
        ),
    }
}

fn status_reply(state: &SharedStatus) -> warp::reply::WithStatus<warp::reply::Json> {
    match state.read() {
        Ok(model) => warp::reply::with_status(warp::reply::json(&*model), StatusCode::OK),
        Err(_) => warp::reply::with_status(
            warp::reply::json(&json!({"status": "error", "reason": "status unavailable"})),
            StatusCode::INTERNAL_SERVER_ERROR,
        ),
    }
}

fn decode_reply(text: &str) -> warp::reply::WithStatus<warp::reply::Json> {
    let decoded = decode_hex(text).and_then(|report| {
        let records: Vec<_> = report.message.records().into_iter().cloned().collect();
        serde_json::to_value(&records)
            .map(|records| (report, records))
            .map_err(|err| trackcore::prelude::CodecError::Render(err.to_string()))
    });
    match decoded {
        Ok((report, records)) => warp::reply::with_status(
            warp::reply::json(&json!({
                "status": "ok",
                "compression": report.compression,
                "notes": report.notes,
                "records": records,
            })),
            StatusCode::OK,
        ),
        Err(err) => warp::reply::with_status(
            warp::reply::json(&json!({
                "status": "error",
                "diagnostic": err.diagnostic(),
            })),
            StatusCode::UNPROCESSABLE_ENTITY,
        ),
    }
}

/// HTTP surface for the operator: status polling, commands, quick fill and
/// the hex decode utility.
pub fn routes(
    state: SharedStatus,
    commands: CommandSender,
) -> impl Filter<Extract = (impl Reply,), Error = Infallible> + Clone {
    let state_filter = warp::any().map(move || state.clone());
    let commands_filter = warp::any().map(move || commands.clone());

    let status_route = warp::path!("status")
        .and(warp::get())
        .and(state_filter)
        .map(|state: SharedStatus| status_reply(&state));

    let command_route = warp::path!("command")
        .and(warp::post())
        .and(warp::body::json())
        .and(commands_filter.clone())
        .map(|command: Command, commands: CommandSender| queue(&commands, command));

    let quickfill_route = warp::path!("quickfill")
        .and(warp::post())
        .and(warp::body::json())
        .and(commands_filter)
        .map(|body: TextBody, commands: CommandSender| {
            queue(&commands, Command::QuickFill { text: body.text })
        });

    let decode_route = warp::path!("decode")
        .and(warp::post())
        .and(warp::body::json())
        .map(|body: TextBody| decode_reply(&body.text));

    status_route
        .or(command_route)
        .or(quickfill_route)
        .or(decode_route)
        .recover(handle_rejection)
}

async fn handle_rejection(rejection: Rejection) -> Result<impl Reply, Infallible> {
    let (code, reason) = if rejection.is_not_found() {
        (StatusCode::NOT_FOUND, "not found".to_string())
    } else if let Some(err) = rejection.find::<warp::filters::body::BodyDeserializeError>() {
        (StatusCode::BAD_REQUEST, err.to_string())
    } else if rejection.find::<warp::reject::MethodNotAllowed>().is_some() {
        (StatusCode::METHOD_NOT_ALLOWED, "method not allowed".to_string())
    } else {
        warn!("unhandled rejection: {:?}", rejection);
        (StatusCode::INTERNAL_SERVER_ERROR, "internal error".to_string())
    };
    Ok(warp::reply::with_status(
        warp::reply::json(&json!({"status": "error", "reason": reason})),
        code,
    ))
}

/// Hosts [`routes`] on its own thread and runtime.
pub struct GuiBridge {
    bind: SocketAddr,
}

impl GuiBridge {
    pub fn spawn(bind: SocketAddr, state: SharedStatus, commands: CommandSender) -> Self {
        let filter = routes(state, commands);
        thread::spawn(move || {
            let runtime = match Builder::new_current_thread().enable_all().build() {
                Ok(runtime) => runtime,
                Err(err) => {
                    error!("HTTP bridge runtime failed: {}", err);
                    return;
                }
            };
            runtime.block_on(async move {
                warp::serve(filter).run(bind).await;
            });
        });
        Self { bind }
    }

    pub fn publish_status(&self, message: &str) {
        info!("[bridge {}] {}", self.bind, message);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gui_bridge::model::StatusModel;
    use std::sync::{Arc, RwLock};
    use tokio::sync::mpsc::unbounded_channel;
    use trackcore::assembler::MessageAssembler;
    use trackcore::controller::FormField;
    use trackcore::target::TargetSnapshot;
    use trackcore::wire::{encode_hex, Compression};
    use trackcore::ControllerState;

    fn shared() -> SharedStatus {
        Arc::new(RwLock::new(StatusModel::default()))
    }

    #[tokio::test]
    async fn status_reports_model() {
        let state = shared();
        state.write().unwrap().state = ControllerState::Paused;
        let (tx, _rx) = unbounded_channel();
        let response = warp::test::request()
            .method("GET")
            .path("/status")
            .reply(&routes(state, tx))
            .await;
        assert_eq!(response.status(), StatusCode::OK);
        let body: serde_json::Value = serde_json::from_slice(response.body()).unwrap();
        assert_eq!(body["state"], "paused");
    }

    #[tokio::test]
    async fn commands_and_quickfill_are_queued() {
        let (tx, mut rx) = unbounded_channel();
        let filter = routes(shared(), tx);

        let response = warp::test::request()
            .method("POST")
            .path("/command")
            .json(&json!({"command": "set_field", "field": "speed", "value": "9"}))
            .reply(&filter)
            .await;
        assert_eq!(response.status(), StatusCode::ACCEPTED);
        assert_eq!(
            rx.recv().await,
            Some(Command::SetField {
                field: FormField::Speed,
                value: "9".into()
            })
        );

        let response = warp::test::request()
            .method("POST")
            .path("/quickfill")
            .json(&json!({"text": "Speed: 4"}))
            .reply(&filter)
            .await;
        assert_eq!(response.status(), StatusCode::ACCEPTED);
        assert_eq!(
            rx.recv().await,
            Some(Command::QuickFill {
                text: "Speed: 4".into()
            })
        );

        let response = warp::test::request()
            .method("POST")
            .path("/command")
            .json(&json!({"command": "jump"}))
            .reply(&filter)
            .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn decode_returns_records_or_diagnostic() {
        let (tx, _rx) = unbounded_channel();
        let filter = routes(shared(), tx);
        let snapshot = TargetSnapshot {
            id: 1_100_000_000_000_000_042,
            ..TargetSnapshot::default()
        };
        let hex = encode_hex(
            &MessageAssembler::default().assemble_batch(&snapshot, 7),
            Compression::Zlib,
        )
        .unwrap();

        let response = warp::test::request()
            .method("POST")
            .path("/decode")
            .json(&json!({ "text": hex }))
            .reply(&filter)
            .await;
        assert_eq!(response.status(), StatusCode::OK);
        let body: serde_json::Value = serde_json::from_slice(response.body()).unwrap();
        assert_eq!(body["compression"], "zlib");
        assert_eq!(body["records"][0]["id"], 1_100_000_000_000_000_042u64);

        let response = warp::test::request()
            .method("POST")
            .path("/decode")
            .json(&json!({"text": "zz"}))
            .reply(&filter)
            .await;
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        let body: serde_json::Value = serde_json::from_slice(response.body()).unwrap();
        assert!(body["diagnostic"].as_str().unwrap().contains("invalid hex"));
    }
}
