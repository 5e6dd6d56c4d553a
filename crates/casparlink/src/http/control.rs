//! Playback intents: `POST /api/{play,stop,clear,loadbg,route}`.
//!
//! Each handler waits for the device's acknowledgement and answers with
//! `{"success": true, "ack": {...}}`.

use axum::Json;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use casparlink_core::{Ack, ChannelLayerAddress, Command};
use serde::Deserialize;
use serde_json::{Value, json};

use super::AppState;
use super::error::ApiError;

type Body<T> = Result<Json<T>, JsonRejection>;

#[derive(Debug, Deserialize)]
pub struct LayerBody {
    channel: u32,
    layer: u32,
}

#[derive(Debug, Deserialize)]
pub struct PlayBody {
    channel: u32,
    layer: u32,
    #[serde(default)]
    file: String,
    #[serde(default, rename = "loop")]
    looping: bool,
}

#[derive(Debug, Deserialize)]
pub struct LoadBody {
    channel: u32,
    layer: u32,
    #[serde(default)]
    file: String,
    #[serde(default)]
    auto: bool,
}

#[derive(Debug, Deserialize)]
pub struct RouteBody {
    channel: u32,
    layer: u32,
    /// Input id from the routing config.
    #[serde(default)]
    source: String,
}

pub async fn play(State(state): State<AppState>, body: Body<PlayBody>) -> Result<Json<Value>, ApiError> {
    let Json(body) = body?;
    run(
        &state,
        Command::Play {
            address: ChannelLayerAddress::new(body.channel, body.layer),
            locator: body.file,
            looping: body.looping,
        },
    )
    .await
}

pub async fn stop(State(state): State<AppState>, body: Body<LayerBody>) -> Result<Json<Value>, ApiError> {
    let Json(body) = body?;
    run(
        &state,
        Command::Stop {
            address: ChannelLayerAddress::new(body.channel, body.layer),
        },
    )
    .await
}

pub async fn clear(State(state): State<AppState>, body: Body<LayerBody>) -> Result<Json<Value>, ApiError> {
    let Json(body) = body?;
    run(
        &state,
        Command::Clear {
            address: ChannelLayerAddress::new(body.channel, body.layer),
        },
    )
    .await
}

pub async fn load_background(
    State(state): State<AppState>,
    body: Body<LoadBody>,
) -> Result<Json<Value>, ApiError> {
    let Json(body) = body?;
    run(
        &state,
        Command::LoadBackground {
            address: ChannelLayerAddress::new(body.channel, body.layer),
            locator: body.file,
            auto: body.auto,
        },
    )
    .await
}

pub async fn route(State(state): State<AppState>, body: Body<RouteBody>) -> Result<Json<Value>, ApiError> {
    let Json(body) = body?;
    run(
        &state,
        Command::Route {
            address: ChannelLayerAddress::new(body.channel, body.layer),
            input_id: body.source,
        },
    )
    .await
}

async fn run(state: &AppState, command: Command) -> Result<Json<Value>, ApiError> {
    let ack: Ack = state.manager.dispatch(command).await?;
    Ok(Json(json!({ "success": true, "ack": ack })))
}
