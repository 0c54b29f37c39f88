pub type Result<T> = std::result::Result<T, crate::error::Error>;

#[macro_export]
macro_rules! verify_arg {
    ($name:expr, $expr:expr) => {{
        let result = $expr;
        $crate::result::verify_arg(result, stringify!($name), stringify!($expr))?;
    }};
}

#[inline]
pub fn verify_arg(predicate: bool, name: &str, condition: &str) -> Result<()> {
    if predicate {
        Ok(())
    } else {
        invalid_arg(name, condition)
    }
}

#[cold]
pub fn invalid_arg(name: &str, condition: &str) -> Result<()> {
    Err(crate::error::ErrorKind::InvalidArgument {
        name: name.to_string(),
        message: condition.to_string(),
    }
    .into())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn check_alignment(alignment: usize) -> Result<()> {
        crate::verify_arg!(alignment, alignment.is_power_of_two());
        Ok(())
    }

    #[test]
    fn test_verify_arg_macro() {
        assert!(check_alignment(64).is_ok());
        let err = check_alignment(48).unwrap_err();
        assert_eq!(
            err.to_string(),
            "invalid argument alignment: alignment.is_power_of_two()"
        );
    }
}
