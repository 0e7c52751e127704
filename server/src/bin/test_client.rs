use futures_util::{SinkExt, StreamExt};
use serde_json::{json, Value};
use shared::{tags, Event, GameStateUpdate, Hex};
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

async fn send(socket: &mut Socket, event_type: &str, payload: Value) -> Result<(), Box<dyn std::error::Error>> {
    let event = Event {
        event_type: event_type.to_string(),
        payload,
    };
    socket.send(Message::Text(event.to_json()?)).await?;
    Ok(())
}

// Wait for the next event, skipping clock traffic
async fn receive(socket: &mut Socket) -> Result<Event, Box<dyn std::error::Error>> {
    loop {
        let frame = timeout(Duration::from_secs(5), socket.next())
            .await?
            .ok_or("connection closed")??;

        if let Message::Text(text) = frame {
            let event = Event::from_json(&text)?;
            if event.event_type != tags::RECEIVE_CLOCK_UPDATE {
                return Ok(event);
            }
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let url = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "ws://127.0.0.1:8080".to_string());

    println!("Connecting two players to {}", url);
    let (mut alice, _) = connect_async(url.as_str()).await?;
    let (mut bob, _) = connect_async(url.as_str()).await?;

    // Alice creates a game
    send(&mut alice, tags::SEND_INITIALIZE_GAME, json!({"playerID": "alice"})).await?;
    let created = receive(&mut alice).await?;
    let join_code = created.payload["joinCode"]
        .as_str()
        .ok_or("missing join code")?
        .to_string();
    println!("Game created with join code {}", join_code);

    // Bob joins it
    send(
        &mut bob,
        tags::SEND_JOIN_GAME,
        json!({"playerID": "bob", "joinCode": join_code}),
    )
    .await?;
    for (name, socket) in [("alice", &mut alice), ("bob", &mut bob)] {
        let joined = receive(socket).await?;
        println!(
            "{} sees {} players (main client: {})",
            name, joined.payload["playerCount"], joined.payload["isMainClient"]
        );
    }

    // Alice starts the game
    send(&mut alice, tags::SEND_START_GAME, json!({"playerID": "alice"})).await?;
    let started = receive(&mut alice).await?;
    receive(&mut bob).await?;
    let update: GameStateUpdate = started.decode()?;
    println!("Game status: {:?}", update.game_state.status);

    let alice_state = update
        .game_state
        .players
        .get("alice")
        .and_then(|player| player.state.clone())
        .ok_or("alice has no state")?;
    let target: Hex = alice_state.cells_in_range()[0];

    // Players start without action points, so the server refuses this move
    // until the clock has granted one
    send(
        &mut alice,
        tags::SEND_PLAYER_MOVE,
        json!({"playerID": "alice", "hex": target}),
    )
    .await?;
    let reply = receive(&mut alice).await?;
    match reply.event_type.as_str() {
        tags::RECEIVE_INVALID_ACTION => {
            println!("Move refused: {}", reply.payload["message"]);
        }
        other => println!("Move answered with {}", other),
    }

    alice.close(None).await?;
    bob.close(None).await?;
    println!("Done");
    Ok(())
}
