//! Stream sampled frames as they are captured (feature = "async").
//!
//! Usage:
//!   cargo run --features=async --example async_sampling -- <input_file>

use std::error::Error;

use tokio_stream::StreamExt;
use framepack::{SamplingOptions, sample_file_stream};

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let input_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "input.mp4".to_string());

    println!("Sampling {input_path}...");
    let mut stream = sample_file_stream(&input_path, SamplingOptions::new());

    let mut count = 0u64;
    while let Some(result) = stream.next().await {
        let frame = result?;
        if count == 0 {
            frame.image.save("first_thumbnail.png")?;
            println!(
                "Saved first_thumbnail.png ({}x{})",
                frame.image.width(),
                frame.image.height(),
            );
        }
        count += 1;
        print!("\rReceived {} at {:.2}s ({count} total)", frame.id, frame.timestamp.as_secs_f64());
    }
    println!();

    println!("Done!");
    Ok(())
}
