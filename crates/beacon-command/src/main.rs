use beacon_client::{ClientError, RegistryClient};
use beacon_core::{DataCenterInfo, Instance, LeaseInfo, Status};
use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(name = "beacon")]
#[command(about = "Instance lifecycle CLI for Eureka-style registries", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[arg(long, env = "BEACON_REGISTRY_URL", default_value = "http://localhost:8080")]
    registry: String,
}

#[derive(Args)]
struct Target {
    #[arg(long)]
    app: String,
    #[arg(long)]
    instance_id: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Register (or refresh) an instance
    Register {
        #[command(flatten)]
        target: Target,
        #[arg(long, default_value = "localhost")]
        host_name: String,
        #[arg(long, default_value = "127.0.0.1")]
        ip_addr: String,
        #[arg(long)]
        port: Option<u16>,
        #[arg(long)]
        secure_port: Option<u16>,
        /// Defaults to the app name
        #[arg(long)]
        vip_address: Option<String>,
        #[arg(long, default_value = "UP")]
        status: Status,
        #[arg(long, default_value_t = 30)]
        renewal_interval: u32,
        #[arg(long, default_value_t = 90)]
        lease_duration: u32,
        /// Metadata entry as key=value, repeatable
        #[arg(long = "metadata", value_parser = parse_key_val)]
        metadata: Vec<(String, String)>,
        /// Print the registration body before sending it
        #[arg(long)]
        print: bool,
    },
    /// Remove an instance from the registry
    Deregister {
        #[command(flatten)]
        target: Target,
    },
    /// Renew an instance's lease once
    Heartbeat {
        #[command(flatten)]
        target: Target,
    },
    /// Force the advertised status of an instance
    OverrideStatus {
        #[command(flatten)]
        target: Target,
        #[arg(long)]
        status: Status,
    },
    /// Clear a status override
    RemoveOverride {
        #[command(flatten)]
        target: Target,
    },
}

fn parse_key_val(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((key, value)) if !key.is_empty() => Ok((key.to_string(), value.to_string())),
        _ => Err(format!("expected key=value, got `{raw}`")),
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let client = RegistryClient::new(cli.registry.as_str())?;

    match cli.command {
        Commands::Register {
            target,
            host_name,
            ip_addr,
            port,
            secure_port,
            vip_address,
            status,
            renewal_interval,
            lease_duration,
            metadata,
            print,
        } => {
            let vip_address = vip_address.unwrap_or_else(|| target.app.clone());
            let mut instance = Instance::new(target.app.clone(), target.instance_id.clone())
                .with_host(host_name, ip_addr)
                .with_vip_address(vip_address.clone())
                .with_status(status)
                .with_data_center(DataCenterInfo::my_own())
                .with_lease(LeaseInfo::new(renewal_interval, lease_duration));
            if let Some(port) = port {
                instance = instance.with_port(port);
            }
            if let Some(port) = secure_port {
                instance = instance
                    .with_secure_port(port)
                    .with_secure_vip_address(vip_address);
            }
            for (key, value) in metadata {
                instance.add_metadata(key, value);
            }

            if print {
                let body = serde_json::json!({ "instance": &instance });
                println!("{}", serde_json::to_string_pretty(&body)?);
            }

            client.register(&instance).await?;
            println!("Instance registered: {}/{} ({})", target.app, target.instance_id, status);
        }
        Commands::Deregister { target } => {
            client.deregister(&target.app, &target.instance_id).await?;
            println!("Instance deregistered: {}/{}", target.app, target.instance_id);
        }
        Commands::Heartbeat { target } => {
            match client.heartbeat(&target.app, &target.instance_id).await {
                Ok(()) => println!("Lease renewed: {}/{}", target.app, target.instance_id),
                Err(ClientError::InstanceNotFound) => {
                    eprintln!(
                        "Instance {}/{} is not registered (lease expired?). Run `beacon register` again.",
                        target.app, target.instance_id
                    );
                    std::process::exit(2);
                }
                Err(err) => return Err(err.into()),
            }
        }
        Commands::OverrideStatus { target, status } => {
            client
                .override_status(&target.app, &target.instance_id, status)
                .await?;
            println!("Status of {}/{} overridden to {}", target.app, target.instance_id, status);
        }
        Commands::RemoveOverride { target } => {
            client
                .remove_status_override(&target.app, &target.instance_id)
                .await?;
            println!("Status override removed: {}/{}", target.app, target.instance_id);
        }
    }

    Ok(())
}
