/// Validate concurrency: must be between 1 and 64.
pub fn validate_concurrency(s: &str) -> Result<usize, String> {
    let value = s
        .parse::<usize>()
        .map_err(|_| format!("invalid number: {}", s))?;

    if value == 0 {
        return Err("concurrency must be at least 1".to_string());
    }

    if value > 64 {
        return Err("concurrency cannot exceed 64".to_string());
    }

    Ok(value)
}

/// Validate retry budget: at least one attempt must be allowed.
pub fn validate_retries(s: &str) -> Result<usize, String> {
    let value = s
        .parse::<usize>()
        .map_err(|_| format!("invalid number: {}", s))?;

    if value == 0 {
        return Err("max retries must be at least 1".to_string());
    }

    Ok(value)
}
