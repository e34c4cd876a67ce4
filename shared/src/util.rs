use rand::Rng;

/// 获取当前 UTC 时间戳（毫秒）
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

const BASE36: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// Generate an order id: `ORD-<unix-millis>-<8 random base36 chars>`
pub fn generate_order_id() -> String {
    generate_order_id_at(now_millis())
}

pub fn generate_order_id_at(millis: i64) -> String {
    let mut rng = rand::thread_rng();
    let suffix: String = (0..8)
        .map(|_| BASE36[rng.gen_range(0..BASE36.len())] as char)
        .collect();
    format!("ORD-{}-{}", millis, suffix)
}
