use serde::Serialize;

/// `{"message": ...}` body returned by every successful write.
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: &'static str,
}

/// `{"data": ..., "message": ...}` body returned by reads.
#[derive(Debug, Serialize)]
pub struct DataResponse<T> {
    pub data: T,
    pub message: &'static str,
}

impl MessageResponse {
    pub fn new(message: &'static str) -> Self {
        Self { message }
    }
}

impl<T> DataResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            data,
            message: "Success.",
        }
    }
}
