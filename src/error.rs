use thiserror::Error;

#[derive(Debug, Error)]
pub enum DioramaError {
    #[error("顶点数量与网格不符: 期望 {columns}x{rows}={expected}, 实际 {actual}")]
    GridMismatch {
        columns: usize,
        rows: usize,
        expected: usize,
        actual: usize,
    },
    #[error("网格尺寸不能为零 ({columns}x{rows})")]
    EmptyGrid { columns: usize, rows: usize },
    #[error("配置无效: {0}")]
    Config(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("OBJ 加载失败: {0}")]
    Obj(#[from] obj::ObjError),
    #[error("图片写入失败: {0}")]
    Image(#[from] image::ImageError),
    #[error("窗口错误: {0}")]
    Window(#[from] minifb::Error),
    #[error("回调失败: {0}")]
    Callback(String),
}
