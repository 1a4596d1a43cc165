pub type BconfResult<T> = Result<T, BconfError>;

/// Crate-wide error type.
///
/// Every parse failure surfaces as a single [BconfError::Parse] carrying the
/// message and the one-indexed row/column of the offending token. Loader
/// failures start out as [BconfError::Io] and are re-wrapped into `Parse` at
/// the statement that triggered the load.
#[derive(thiserror::Error, Debug)]
pub enum BconfError {
    Parse {
        file: Option<String>,
        row: u32,
        column: u32,
        message: String,
    },
    Io(#[from] std::io::Error),
}

impl BconfError {
    pub fn parse<M: Into<String>>(row: u32, column: u32, message: M) -> Self {
        BconfError::Parse {
            file: None,
            row,
            column,
            message: message.into(),
        }
    }

    pub fn message(&self) -> String {
        match self {
            BconfError::Parse { message, .. } => message.clone(),
            BconfError::Io(err) => err.to_string(),
        }
    }

    pub fn row(&self) -> Option<u32> {
        match self {
            BconfError::Parse { row, .. } => Some(*row),
            _ => None,
        }
    }

    pub fn column(&self) -> Option<u32> {
        match self {
            BconfError::Parse { column, .. } => Some(*column),
            _ => None,
        }
    }

    /// Attaches a source filename for error display purposes.
    pub fn with_file(self, filename: Option<&str>) -> Self {
        match self {
            BconfError::Parse {
                file: None,
                row,
                column,
                message,
            } => BconfError::Parse {
                file: filename.map(|f| f.to_string()),
                row,
                column,
                message,
            },
            other => other,
        }
    }
}

impl PartialEq for BconfError {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (
                BconfError::Parse {
                    file: lfile,
                    row: lrow,
                    column: lcol,
                    message: lmsg,
                },
                BconfError::Parse {
                    file: rfile,
                    row: rrow,
                    column: rcol,
                    message: rmsg,
                },
            ) => lfile == rfile && lrow == rrow && lcol == rcol && lmsg == rmsg,
            _ => false,
        }
    }
}

impl std::fmt::Display for BconfError {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            BconfError::Parse {
                file,
                row,
                column,
                message,
            } => {
                let prefix = match file {
                    Some(file) => format!("{}:", file),
                    None => "".to_string(),
                };
                write!(f, "{}{}:{}: error: {}", prefix, row, column, message)
            }
            BconfError::Io(err) => write!(f, "{}", err),
        }
    }
}
