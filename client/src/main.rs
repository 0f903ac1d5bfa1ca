use common::bridge_err;
use common::errors::{BridgeError, BridgeErrorKind};
use common::event::NotificationEvent;
use common::protocol::{Request, Response};
use tracing_subscriber::EnvFilter;

use crate::connection::ClientConnection;

mod connection;

const USAGE: &str = "usage: shade <status|permission|request-permission|active|reply <id> <message>|listen>";

#[tokio::main]
async fn main() -> Result<(), BridgeError> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into()))
        .init();

    let mut args = std::env::args().skip(1);
    let verb = args.next().unwrap_or_else(|| "status".to_string());
    let mut client = ClientConnection::new().await?;

    match verb.as_str() {
        "status" => match client.send(Request::GetStatus).await? {
            Response::Status {
                running,
                permission_granted,
            } => {
                println!("running: {running}");
                println!("permission granted: {permission_granted}");
            }
            other => print_response(other),
        },
        "permission" => print_response(client.send(Request::IsPermissionGranted).await?),
        "request-permission" => print_response(client.send(Request::RequestPermission).await?),
        "active" => match client.send(Request::ActiveNotifications).await? {
            Response::Notifications(events) => {
                for event in events {
                    print_event(&event);
                }
            }
            other => print_response(other),
        },
        "reply" => {
            let id = args
                .next()
                .and_then(|raw| raw.parse::<u32>().ok())
                .ok_or_else(|| bridge_err!(BridgeErrorKind::InvalidData, USAGE))?;
            let message = args.collect::<Vec<_>>().join(" ");
            if message.is_empty() {
                return Err(bridge_err!(BridgeErrorKind::InvalidData, USAGE));
            }
            print_response(
                client
                    .send(Request::SendReply {
                        message,
                        notification_id: id,
                    })
                    .await?,
            );
        }
        "listen" => {
            let mut events = client.subscribe().await?;
            while let Some(event) = events.next().await? {
                print_event(&event);
            }
        }
        _ => eprintln!("{USAGE}"),
    }

    Ok(())
}

fn print_event(event: &NotificationEvent) {
    match serde_json::to_string(event) {
        Ok(json) => println!("{json}"),
        Err(e) => eprintln!("failed to render event: {e}"),
    }
}

fn print_response(resp: Response) {
    match resp {
        Response::Granted(granted) => println!("{granted}"),
        Response::ReplySent(sent) => println!("{sent}"),
        Response::Ok => println!("ok"),
        Response::Pong => println!("pong"),
        Response::Error(msg) => eprintln!("error: {msg}"),
        other => println!("{other:?}"),
    }
}
