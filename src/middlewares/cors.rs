use actix_cors::Cors;

/// 管理接口只读写 JSON，不携带凭据
pub fn create_cors() -> Cors {
    Cors::default()
        .allowed_origin_fn(|_, _req_head| {
            // 内网部署，放开来源
            true
        })
        .allowed_methods(vec!["GET", "POST", "OPTIONS"])
        .allow_any_header()
        .max_age(3600)
}
