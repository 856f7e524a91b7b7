//! Test Request Producer
//!
//! Generates legitimate and suspicious detection requests for all four
//! sectors, sends them to the router over NATS request/reply and logs the
//! replies.

use rand::Rng;
use serde::Serialize;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{info, warn};

const SECTORS: [&str; 4] = ["banking", "medical", "ecommerce", "supply_chain"];

/// Request body matching the router's input format
#[derive(Debug, Clone, Serialize)]
struct DetectionRequest {
    sector: &'static str,
    data: Value,
}

/// Request generator for testing
struct RequestGenerator {
    rng: rand::rngs::ThreadRng,
    counter: u64,
}

impl RequestGenerator {
    fn new() -> Self {
        Self {
            rng: rand::thread_rng(),
            counter: 0,
        }
    }

    fn generate(&mut self, suspicious: bool) -> DetectionRequest {
        self.counter += 1;
        let sector = SECTORS[self.rng.gen_range(0..SECTORS.len())];
        let data = match (sector, suspicious) {
            ("banking", false) => self.legitimate_banking(),
            ("banking", true) => self.suspicious_banking(),
            ("medical", false) => self.legitimate_medical(),
            ("medical", true) => self.suspicious_medical(),
            ("ecommerce", false) => self.legitimate_ecommerce(),
            ("ecommerce", true) => self.suspicious_ecommerce(),
            (_, false) => self.legitimate_supply_chain(),
            (_, true) => self.suspicious_supply_chain(),
        };
        DetectionRequest { sector, data }
    }

    fn legitimate_banking(&mut self) -> Value {
        json!({
            "transaction_id": format!("tx_{:012}", self.counter),
            "amount": self.rng.gen_range(10.0..2000.0_f64).round(),
            "merchant": self.random_choice(&["Grocery Mart", "City Utilities", "Coffee House", "Bookstore"]),
            "location": self.random_choice(&["New York, United States", "Austin, United States", "Toronto, Canada"]),
            "time": format!("{:02}:{:02}", self.rng.gen_range(8..20), self.rng.gen_range(0..60)),
            "device": "known device",
            "account_age_days": self.rng.gen_range(365..3000),
            "transaction_velocity": self.rng.gen_range(0..3),
            "kyc_verified": true,
        })
    }

    fn suspicious_banking(&mut self) -> Value {
        json!({
            "transaction_id": format!("tx_{:012}", self.counter),
            "amount": self.rng.gen_range(20_000.0..250_000.0_f64).round(),
            "transaction_type": self.random_choice(&["crypto transfer", "wire transfer"]),
            "source_country": "United States",
            "destination_country": self.random_choice(&["Iran", "Cayman Islands", "Nigeria", "North Korea"]),
            "ip_address": self.random_choice(&["TOR exit node", "VPN detected", "unknown"]),
            "time": format!("{:02}:{:02}", self.rng.gen_range(0..5), self.rng.gen_range(0..60)),
            "device": "new device",
            "account_age_days": self.rng.gen_range(0..20),
            "transaction_velocity": self.rng.gen_range(8..30),
            "kyc_verified": false,
        })
    }

    fn legitimate_medical(&mut self) -> Value {
        json!({
            "claim_id": format!("clm_{:010}", self.counter),
            "claim_amount": self.rng.gen_range(150.0..3000.0_f64).round(),
            "provider_specialty": "family medicine",
            "diagnosis_codes": ["J20.9"],
            "procedure_codes": ["99213"],
            "patient_age": self.rng.gen_range(18..80),
            "provider_history": "clean record",
            "provider_verified": true,
        })
    }

    fn suspicious_medical(&mut self) -> Value {
        json!({
            "claim_id": format!("clm_{:010}", self.counter),
            "claim_amount": self.rng.gen_range(40_000.0..150_000.0_f64).round(),
            "specialty_average_claim": 8000,
            "provider_specialty": "dermatology",
            "diagnosis_codes": ["L70.0"],
            "procedure_codes": ["33533", "33534", "93458", "27447", "99285", "43239", "47562"],
            "patient_age": self.rng.gen_range(18..30),
            "provider_history": "flagged for upcoding",
            "diagnosis_mismatch": true,
            "provider_verified": false,
        })
    }

    fn legitimate_ecommerce(&mut self) -> Value {
        let market = self.rng.gen_range(50.0..1500.0_f64).round();
        json!({
            "order_id": format!("ord_{:010}", self.counter),
            "product": self.random_choice(&["Wireless Headphones", "Running Shoes", "Coffee Maker"]),
            "price": (market * self.rng.gen_range(0.9..1.1)).round(),
            "market_price": market,
            "seller_age_days": self.rng.gen_range(400..3000),
            "seller_rating": 4.6,
            "reviews": self.rng.gen_range(50..5000),
            "payment_method": "credit card",
            "shipping_address": "12 Main St, Denver",
            "billing_address": "12 Main St, Denver",
            "email_verified": true,
            "shipping_origin": "United States",
        })
    }

    fn suspicious_ecommerce(&mut self) -> Value {
        let market = self.rng.gen_range(500.0..2000.0_f64).round();
        json!({
            "order_id": format!("ord_{:010}", self.counter),
            "product": self.random_choice(&["Designer Handbag", "Latest Smartphone", "Gaming Laptop"]),
            "price": (market * self.rng.gen_range(0.1..0.4)).round(),
            "market_price": market,
            "seller_age_days": self.rng.gen_range(0..10),
            "reviews": 0,
            "payment_method": self.random_choice(&["wire transfer", "gift card", "cryptocurrency"]),
            "shipping_address": "PO Box 441, Miami",
            "billing_address": "77 Elm Rd, Seattle",
            "ip_address": "VPN detected",
            "email_verified": false,
            "shipping_origin": "unknown",
        })
    }

    fn legitimate_supply_chain(&mut self) -> Value {
        json!({
            "order_id": format!("po_{:010}", self.counter),
            "supplier": "Acme Components",
            "supplier_age_days": self.rng.gen_range(1000..5000),
            "order_amount": self.rng.gen_range(5_000.0..80_000.0_f64).round(),
            "price_variance": self.rng.gen_range(-5..10),
            "payment_terms": "net 30",
            "delivery_reliability": 97,
            "documentation_complete": true,
            "order_details": "Standard quarterly restock, long-term supplier",
        })
    }

    fn suspicious_supply_chain(&mut self) -> Value {
        json!({
            "order_id": format!("po_{:010}", self.counter),
            "supplier": "Global Trade Partners LLC",
            "supplier_age_days": self.rng.gen_range(0..45),
            "order_amount": self.rng.gen_range(200_000.0..900_000.0_f64).round(),
            "price_variance": self.rng.gen_range(40..250),
            "payment_terms": "100% advance payment",
            "delivery_reliability": self.rng.gen_range(40..70),
            "documentation_complete": false,
            "quality_issues": true,
            "order_details": "Urgent order, consulting fee to procurement contact, above market pricing",
            "supplier_country": self.random_choice(&["Syria", "Venezuela", "Myanmar"]),
        })
    }

    fn random_choice<'a>(&mut self, choices: &[&'a str]) -> &'a str {
        choices[self.rng.gen_range(0..choices.len())]
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("test_producer=info".parse()?),
        )
        .init();

    info!("Starting Test Request Producer");

    // Parse arguments
    let args: Vec<String> = std::env::args().collect();
    let nats_url = args.get(1).map(|s| s.as_str()).unwrap_or("nats://localhost:4222");
    let subject = args.get(2).map(|s| s.as_str()).unwrap_or("fraud.detect");
    let count: u64 = args.get(3).and_then(|s| s.parse().ok()).unwrap_or(20);
    let fraud_rate: f64 = args.get(4).and_then(|s| s.parse().ok()).unwrap_or(0.3);
    let delay_ms: u64 = args.get(5).and_then(|s| s.parse().ok()).unwrap_or(500);

    info!(
        nats_url = %nats_url,
        subject = %subject,
        count = count,
        fraud_rate = fraud_rate,
        delay_ms = delay_ms,
        "Configuration loaded"
    );

    // Connect to NATS; replies can take as long as the router's budget
    let client = match async_nats::ConnectOptions::new()
        .request_timeout(Some(Duration::from_secs(120)))
        .connect(nats_url)
        .await
    {
        Ok(c) => {
            info!("Connected to NATS");
            c
        }
        Err(e) => {
            warn!(error = %e, "Failed to connect to NATS. Running in dry-run mode.");
            return run_dry_mode(count, fraud_rate, delay_ms).await;
        }
    };

    let mut generator = RequestGenerator::new();
    let mut rng = rand::thread_rng();

    info!("Sending {} requests...", count);

    let mut legitimate_count = 0;
    let mut suspicious_count = 0;
    let mut failed_count = 0;

    for i in 0..count {
        let suspicious = rng.gen_bool(fraud_rate);
        if suspicious {
            suspicious_count += 1;
        } else {
            legitimate_count += 1;
        }
        let request = generator.generate(suspicious);
        let payload = serde_json::to_vec(&request)?;

        match client.request(subject.to_string(), payload.into()).await {
            Ok(reply) => {
                let body: Value = serde_json::from_slice(&reply.payload).unwrap_or(Value::Null);
                info!(
                    n = i + 1,
                    sector = request.sector,
                    suspicious = suspicious,
                    fraud_score = %body["fraud_score"],
                    risk_level = %body["risk_level"],
                    model_used = %body["model_used"],
                    processing_time_ms = %body["processing_time_ms"],
                    "Reply received"
                );
            }
            Err(e) => {
                failed_count += 1;
                warn!(n = i + 1, sector = request.sector, error = %e, "Request failed");
            }
        }

        tokio::time::sleep(Duration::from_millis(delay_ms)).await;
    }

    info!(
        "Completed! Sent {} requests ({} legitimate, {} suspicious, {} failed)",
        count, legitimate_count, suspicious_count, failed_count
    );

    Ok(())
}

async fn run_dry_mode(count: u64, fraud_rate: f64, delay_ms: u64) -> anyhow::Result<()> {
    info!("Running in dry-run mode (no NATS connection)");

    let mut generator = RequestGenerator::new();
    let mut rng = rand::thread_rng();

    for i in 0..count {
        let request = generator.generate(rng.gen_bool(fraud_rate));
        let json = serde_json::to_string_pretty(&request)?;

        if (i + 1) % 5 == 0 || i == 0 {
            info!("Sample request {}:\n{}", i + 1, json);
        }

        tokio::time::sleep(Duration::from_millis(delay_ms)).await;
    }

    Ok(())
}
