use allo_operations::allo::metadata::{CreateProjectArgs, ProjectMetadata};
use allo_operations::allo::{AlloConfig, Collaborators, create_allo};
use allo_operations::config::Config;
use allo_operations::indexer::{GraphqlIndexerSync, IndexerSync, IndexerSyncConfig};
use allo_operations::ipfs::{PinataConfig, PinataUploader};
use allo_operations::transaction::{AlloyTransactionSender, SenderConfig};

use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

#[tokio::main(flavor = "current_thread")]
async fn main() {
	// Initialize tracing subscriber with debug logging for the pipeline
	tracing_subscriber::fmt()
		.with_env_filter(
			tracing_subscriber::EnvFilter::from_default_env()
				.add_directive("allo_operations=debug".parse().unwrap())
				.add_directive(tracing::Level::INFO.into()),
		)
		.with_target(false)
		.with_thread_ids(false)
		.with_thread_names(false)
		.with_file(false)
		.with_line_number(false)
		.with_timer(tracing_subscriber::fmt::time::time())
		.init();

	// Load environment variables from a .env file when present
	let _ = dotenvy::dotenv();

	let config = match Config::from_env() {
		Ok(config) => config,
		Err(e) => {
			error!("Invalid configuration: {}", e);
			return;
		}
	};
	info!("Loaded configuration: {:?}", config);

	let uploader = match PinataUploader::new(PinataConfig {
		api_url: config.pinata_api_url.clone(),
		jwt: config.pinata_jwt.clone(),
		timeout: Duration::from_secs(60),
	}) {
		Ok(uploader) => uploader,
		Err(e) => {
			error!("Failed to create IPFS uploader: {}", e);
			return;
		}
	};

	let transaction_sender = AlloyTransactionSender::new(
		config.rpc_url.clone(),
		config.signer.clone(),
		SenderConfig {
			confirmation_timeout: config.confirmation_timeout,
			..Default::default()
		},
	);

	let indexer_sync = match &config.indexer_url {
		Some(url) => {
			let sync_config = IndexerSyncConfig {
				timeout: config.indexer_sync_timeout,
				..Default::default()
			};
			match GraphqlIndexerSync::new(url.clone(), sync_config) {
				Ok(sync) => Some(Arc::new(sync) as Arc<dyn IndexerSync>),
				Err(e) => {
					error!("Failed to create indexer client: {}", e);
					return;
				}
			}
		}
		None => {
			warn!("INDEXER_URL not set, operations will not wait for the indexer");
			None
		}
	};

	let collaborators = Collaborators {
		uploader: Arc::new(uploader),
		transaction_sender: Arc::new(transaction_sender),
		indexer_sync,
	};

	let allo = match create_allo(config.version, AlloConfig::new(config.chain, collaborators)) {
		Ok(allo) => allo,
		Err(e) => {
			error!("Failed to select protocol backend: {}", e);
			return;
		}
	};

	let mut args = std::env::args().skip(1);
	let name = args.next().unwrap_or_else(|| "Untitled project".to_string());
	let description = args.next().unwrap_or_default();

	info!("Creating project {}", name);

	let result = allo
		.create_project(CreateProjectArgs {
			name,
			metadata: ProjectMetadata {
				description,
				..Default::default()
			},
		})
		.on_ipfs(|result| match result {
			Ok(cid) => info!("Metadata pinned: {}", cid),
			Err(e) => error!("Metadata upload failed: {}", e),
		})
		.on_transaction(|result| match result {
			Ok(tx_hash) => info!("Transaction submitted: {}", tx_hash),
			Err(e) => error!("Transaction failed: {}", e),
		})
		.on_transaction_status(|result| match result {
			Ok(receipt) => info!(
				"Transaction confirmed in block {} ({})",
				receipt.block_number, receipt.block_hash
			),
			Err(e) => error!("Transaction not confirmed: {}", e),
		})
		.execute()
		.await;

	match result {
		Ok(outcome) => info!("Project created: {}", outcome.project_id),
		Err(e) => error!("Failed to create project: {}", e),
	}
}
