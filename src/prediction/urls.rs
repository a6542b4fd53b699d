/// 默认预测服务地址（本地 FastAPI）
pub const DEFAULT_API_URL: &str = "http://127.0.0.1:8000";

pub const PATH_PREDICT: &str = "/predict";
pub const PATH_ROOT: &str = "/";

pub fn url_predict(base_url: &str) -> String {
    format!("{}{}", base_url.trim_end_matches('/'), PATH_PREDICT)
}

pub fn url_root(base_url: &str) -> String {
    format!("{}{}", base_url.trim_end_matches('/'), PATH_ROOT)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn joins_without_double_slash() {
        assert_eq!(url_predict("http://h:8000/"), "http://h:8000/predict");
        assert_eq!(url_predict("http://h/api"), "http://h/api/predict");
        assert_eq!(url_root("http://h:8000"), "http://h:8000/");
    }
}
