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
    use crate::error::ErrorKind;

    fn checked_row(row: usize, capacity: usize) -> super::Result<usize> {
        verify_arg!(row, row < capacity);
        Ok(row)
    }

    #[test]
    fn test_verify_arg() {
        assert_eq!(checked_row(1, 2).unwrap(), 1);
        let err = checked_row(2, 2).unwrap_err();
        match err.kind() {
            ErrorKind::InvalidArgument { name, message } => {
                assert_eq!(name, "row");
                assert_eq!(message, "row < capacity");
            }
            other => panic!("unexpected error {other:?}"),
        }
    }
}
