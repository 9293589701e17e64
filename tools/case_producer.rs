//! Test Case Producer
//!
//! Generates and publishes beneficiary cases to NATS for pipeline testing.

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{info, warn};

/// Case structure matching the pipeline's expected input format
#[derive(Debug, Clone, Serialize, Deserialize)]
struct Case {
    beneficiary_id: String,
    name: String,
    district: String,
    phone_number: String,
    bank_account: String,
    aadhaar_like_id: String,
    household_id: String,
    annual_income: f64,
    registrations_per_aadhaar: u32,
    bank_shared_count: u32,
    phone_shared_count: u32,
}

/// Case generator for testing
struct CaseGenerator {
    rng: rand::rngs::ThreadRng,
    case_counter: u64,
}

impl CaseGenerator {
    fn new() -> Self {
        Self {
            rng: rand::thread_rng(),
            case_counter: 0,
        }
    }

    /// Generate a genuine beneficiary case
    fn generate_genuine(&mut self) -> Case {
        self.case_counter += 1;

        Case {
            beneficiary_id: format!("BEN{:07}", self.case_counter),
            name: format!("Beneficiary {}", self.case_counter),
            district: format!("District_{}", self.rng.gen_range(1..=20)),
            phone_number: format!("9{:09}", self.rng.gen_range(0..1_000_000_000u64)),
            bank_account: format!("AC{:010}", self.rng.gen::<u32>()),
            aadhaar_like_id: format!("ID{:012}", self.rng.gen::<u64>() % 1_000_000_000_000),
            household_id: format!("HH{:08}", self.rng.gen_range(0..10_000_000u32)),
            annual_income: self.rng.gen_range(20_000.0..90_000.0),
            registrations_per_aadhaar: 1,
            bank_shared_count: 1,
            phone_shared_count: self.rng.gen_range(1..=2),
        }
    }

    /// Generate a collusive case: shared attributes drawn from a small pool,
    /// so many cases collide on the same phone, account, and identity values
    fn generate_collusive(&mut self) -> Case {
        self.case_counter += 1;
        let ring = self.rng.gen_range(1..=5u32);

        Case {
            beneficiary_id: format!("BEN{:07}", self.case_counter),
            name: format!("Beneficiary {}", self.case_counter),
            district: "District_1".to_string(),
            phone_number: format!("8000000{:03}", ring),
            bank_account: format!("ACRING{:04}", ring),
            aadhaar_like_id: format!("IDRING{:04}", ring),
            household_id: format!("HHRING{:04}", ring),
            annual_income: self.rng.gen_range(100_000.0..400_000.0),
            registrations_per_aadhaar: self.rng.gen_range(3..=8),
            bank_shared_count: self.rng.gen_range(6..=14),
            phone_shared_count: self.rng.gen_range(5..=12),
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("case_producer=info".parse()?),
        )
        .init();

    info!("Starting Test Case Producer");

    // Parse arguments
    let args: Vec<String> = std::env::args().collect();
    let nats_url = args.get(1).map(|s| s.as_str()).unwrap_or("nats://localhost:4222");
    let subject = args.get(2).map(|s| s.as_str()).unwrap_or("fraud.cases");
    let count: u64 = args.get(3).and_then(|s| s.parse().ok()).unwrap_or(100);
    let collusion_rate: f64 = args.get(4).and_then(|s| s.parse().ok()).unwrap_or(0.1);
    let delay_ms: u64 = args.get(5).and_then(|s| s.parse().ok()).unwrap_or(100);

    info!(
        nats_url = %nats_url,
        subject = %subject,
        count = count,
        collusion_rate = collusion_rate,
        delay_ms = delay_ms,
        "Configuration loaded"
    );

    // Connect to NATS
    let client = match async_nats::connect(nats_url).await {
        Ok(c) => {
            info!("Connected to NATS");
            c
        }
        Err(e) => {
            warn!(error = %e, "Failed to connect to NATS. Running in dry-run mode.");
            return run_dry_mode(count, collusion_rate, delay_ms).await;
        }
    };

    // Generate and publish cases
    let mut generator = CaseGenerator::new();
    let mut rng = rand::thread_rng();

    info!("Starting to publish {} cases...", count);

    let mut genuine_count = 0;
    let mut collusive_count = 0;

    for i in 0..count {
        let case = if rng.gen_bool(collusion_rate) {
            collusive_count += 1;
            generator.generate_collusive()
        } else {
            genuine_count += 1;
            generator.generate_genuine()
        };

        let payload = serde_json::to_vec(&case)?;

        client.publish(subject.to_string(), payload.into()).await?;

        if (i + 1) % 10 == 0 {
            info!(
                "Published {}/{} cases ({} genuine, {} collusive)",
                i + 1,
                count,
                genuine_count,
                collusive_count
            );
        }

        tokio::time::sleep(Duration::from_millis(delay_ms)).await;
    }

    info!(
        "Completed! Published {} cases ({} genuine, {} collusive)",
        count, genuine_count, collusive_count
    );

    Ok(())
}

async fn run_dry_mode(count: u64, collusion_rate: f64, delay_ms: u64) -> anyhow::Result<()> {
    info!("Running in dry-run mode (no NATS connection)");

    let mut generator = CaseGenerator::new();
    let mut rng = rand::thread_rng();

    for i in 0..count {
        let case = if rng.gen_bool(collusion_rate) {
            generator.generate_collusive()
        } else {
            generator.generate_genuine()
        };

        let json = serde_json::to_string_pretty(&case)?;

        if (i + 1) % 10 == 0 || i == 0 {
            info!("Sample case {}:\n{}", i + 1, json);
        }

        tokio::time::sleep(Duration::from_millis(delay_ms)).await;
    }

    Ok(())
}
