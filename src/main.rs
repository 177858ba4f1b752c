use anyhow::{Context, Result, anyhow, bail};
use tracing::error;

use where2meet::{Location, MeetingZoneEngine, Where2MeetConfig, telemetry};

const USAGE: &str = "usage: where2meet <lat,lon[,name]> <lat,lon[,name]>";

/// Parse `lat,lon` or `lat,lon,name`; the name defaults to the coordinates
fn parse_location(arg: &str) -> Result<Location> {
    let mut parts = arg.splitn(3, ',');
    let lat: f64 = parts
        .next()
        .ok_or_else(|| anyhow!("missing latitude in '{arg}'"))?
        .trim()
        .parse()
        .with_context(|| format!("invalid latitude in '{arg}'"))?;
    let lon: f64 = parts
        .next()
        .ok_or_else(|| anyhow!("missing longitude in '{arg}'"))?
        .trim()
        .parse()
        .with_context(|| format!("invalid longitude in '{arg}'"))?;
    let name = parts
        .next()
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map_or_else(|| format!("{lat}, {lon}"), str::to_string);

    let location = Location::new(lat, lon, name);
    if !location.point.is_valid() {
        bail!("coordinates out of range in '{arg}'");
    }
    Ok(location)
}

#[tokio::main]
async fn main() -> Result<()> {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let [a, b] = args.as_slice() else {
        bail!(USAGE);
    };
    let location_a = parse_location(a)?;
    let location_b = parse_location(b)?;

    let config = Where2MeetConfig::load().context("Failed to load configuration")?;
    telemetry::init(&config.logging)?;

    let engine = MeetingZoneEngine::from_config(&config)?;
    let result = match engine.compute(&location_a, &location_b).await {
        Ok(result) => result,
        Err(e) => {
            error!("Meeting zone computation failed: {}", e);
            bail!(e.user_message());
        }
    };

    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_parse_named_location() {
        let location = parse_location("37.77,-122.42,San Francisco, CA").unwrap();
        assert_eq!(location.point.latitude, 37.77);
        assert_eq!(location.point.longitude, -122.42);
        assert_eq!(location.display_name, "San Francisco, CA");
    }

    #[test]
    fn test_parse_unnamed_location() {
        let location = parse_location(" 37.87 , -122.27").unwrap();
        assert_eq!(location.display_name, "37.87, -122.27");
    }

    #[rstest]
    #[case::empty("")]
    #[case::single_number("37.77")]
    #[case::not_a_number("north,-122.42")]
    #[case::out_of_range("95.0,10.0")]
    fn test_parse_rejects_bad_input(#[case] arg: &str) {
        assert!(parse_location(arg).is_err());
    }
}
