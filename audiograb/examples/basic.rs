//! Fetch a media URL and print the result as JSON.
//!
//! Usage: cargo run --example basic -- https://www.xiaohongshu.com/explore/abc123

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let url = std::env::args()
        .nth(1)
        .expect("usage: basic <media-url>");

    let audio = audiograb::fetch(&url).await?;

    println!("{}", audio.to_json_pretty()?);

    Ok(())
}
