// Watch the lottery event stream.
// -------------------------------
// Connects to the server-push endpoint and prints `info`, `invoices` and
// `payments` events until Ctrl-C. The connection is retried with backoff
// when the server goes away; state changes are logged.
//
// Run:
//   BTRY_API_URL=http://127.0.0.1:8080 cargo run --example watch_events
//
// Env:
//   BTRY_API_URL  (default: http://localhost:8080)
//   RUST_LOG      (default: info)

use btry_client::rpc::sse::{Backoff, EventStream};
use btry_client::types::{InfoPayload, InvoicesPayload, PaymentsPayload};
use btry_client::{nickname_from_key, ClientConfig};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).with_target(false).init();

    let config = ClientConfig::from_env()?;
    let url = config.events_url()?;
    println!("Watching {url}. Press Ctrl-C to exit.\n");

    let stream = EventStream::connect(url, Backoff::new(config.backoff_floor, config.backoff_ceiling))?;

    stream.on(|info: InfoPayload| {
        if let Some(pool) = info.prize_pool {
            println!("[info] prize pool: {pool} sats");
        }
        if let Some(height) = info.next_height {
            println!("[info] next draw at block {height}");
        }
        for w in info.winners.unwrap_or_default() {
            println!("[info] winner {} took {} sats", nickname_from_key(&w.public_key), w.prizes);
        }
    });
    stream.on(|inv: InvoicesPayload| {
        println!(
            "[invoices] #{} from {}: {} sats, status {:?}",
            inv.payment_id,
            nickname_from_key(&inv.public_key),
            inv.amount,
            inv.status
        );
    });
    stream.on(|pay: PaymentsPayload| {
        println!("[payments] #{} status {:?} {}", pay.payment_id, pay.status, pay.error);
    });

    let mut states = stream.state_changes();
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            changed = states.changed() => {
                if changed.is_err() {
                    break;
                }
                let state = *states.borrow_and_update();
                tracing::info!(?state, "stream state");
            }
        }
    }

    println!("Closing event stream…");
    stream.close();
    Ok(())
}
