use semver::Version;

pub fn get_version() -> String {
    let semver = env!("CARGO_PKG_VERSION").parse::<Version>();

    match semver {
        // vergen leaves this placeholder when building outside of a git checkout.
        Ok(semver) if env!("VERGEN_GIT_SHA") == "VERGEN_IDEMPOTENT_OUTPUT" => semver.to_string(),
        Ok(semver) => format!("{} [`{}`]", semver, env!("VERGEN_GIT_SHA")),
        Err(e) => {
            tracing::warn!(err = ?e, "couldn't parse a semver out of Cargo.toml? defaulting to 0.0.0-unknown.");
            String::from("0.0.0-unknown")
        }
    }
}
