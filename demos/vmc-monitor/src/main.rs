//! Headless VMC monitor
//!
//! Usage: `vmc-monitor [port] [config.json]`
//!
//! Binds a UDP port, feeds a receiver driving an in-memory avatar, and
//! logs peripheral input plus a periodic status line. `RUST_LOG` controls
//! verbosity; `RUST_LOG=debug` also shows MIDI and tracker traffic.

use std::cell::RefCell;
use std::net::SocketAddr;
use std::rc::Rc;
use std::time::Duration;

use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt as _, util::SubscriberInitExt as _};

use vmc_core::{VmcError, VmcResult};
use vmc_receiver::{
    Avatar, BlendShapeState, Camera, ExternalReceiver, HumanBone, ReceiverConfig,
};
use vmc_transport::{start_receive_loop, UdpSource, DEFAULT_PORT};

const STATUS_INTERVAL: Duration = Duration::from_secs(2);

fn init_tracing() {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();
}

fn load_config(path: Option<&str>) -> VmcResult<ReceiverConfig> {
    match path {
        Some(path) => {
            let json = std::fs::read_to_string(path)
                .map_err(|e| VmcError::InvalidConfig(format!("{}: {}", path, e)))?;
            ReceiverConfig::from_json_str(&json)
        }
        None => Ok(ReceiverConfig::default()),
    }
}

fn parse_port(arg: Option<&str>) -> VmcResult<u16> {
    match arg {
        Some(s) => s
            .parse()
            .map_err(|_| VmcError::InvalidConfig(format!("invalid port: {}", s))),
        None => Ok(DEFAULT_PORT),
    }
}

async fn run(port: u16, config: ReceiverConfig) -> VmcResult<()> {
    let avatar = Rc::new(RefCell::new(Avatar::humanoid()));
    let face = Rc::new(RefCell::new(BlendShapeState::new()));
    let camera = Rc::new(RefCell::new(Camera::default()));

    let receiver = Rc::new(ExternalReceiver::new(config)?);
    receiver.set_model(avatar.clone());
    receiver.set_blend_shape_proxy(face.clone());
    receiver.set_camera(camera.clone());
    receiver.attach_source();

    receiver.add_key_listener(|key| {
        info!("Key {} {} ({})", if key.active != 0 { "down" } else { "up" }, key.name, key.keycode);
    });
    receiver.add_controller_listener(|con| {
        info!(
            "Controller {} {} active={} axis={}",
            if con.is_left != 0 { "L" } else { "R" },
            con.name,
            con.active,
            con.axis
        );
    });

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let source = UdpSource::bind(addr).await?;
    info!("Listening on {}", source.local_addr());

    let mut messages = start_receive_loop(source.socket(), 1024);
    let mut status = tokio::time::interval(STATUS_INTERVAL);

    loop {
        tokio::select! {
            message = messages.recv() => {
                let Some(message) = message else {
                    return Err(VmcError::TransportError("receive loop stopped".into()));
                };
                receiver.on_data_received(&message);
            }
            _ = status.tick() => {
                receiver.tick();
                let state = receiver.state();
                let stats = receiver.stats();
                let hips = avatar.borrow().bone(HumanBone::Hips).map(|t| t.position);
                info!(
                    status = %state.status,
                    shutdown = state.shutdown,
                    messages = stats.messages,
                    ignored = stats.ignored,
                    remote_time = state.remote_time,
                    "root={} hips={:?} face={:?} fov={}",
                    avatar.borrow().root.position,
                    hips,
                    face.borrow().dominant(),
                    camera.borrow().field_of_view,
                );
                if let Some(err) = state.last_error {
                    error!("last error: {}", err);
                }
            }
        }
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    init_tracing();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let port = match parse_port(args.first().map(String::as_str)) {
        Ok(port) => port,
        Err(e) => {
            error!("{}", e);
            std::process::exit(2);
        }
    };
    let config = match load_config(args.get(1).map(String::as_str)) {
        Ok(config) => config,
        Err(e) => {
            error!("{}", e);
            std::process::exit(2);
        }
    };

    if let Err(e) = run(port, config).await {
        error!("{}", e);
        std::process::exit(1);
    }
}
