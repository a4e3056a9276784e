//! Basename 合约调用编码
//!
//! 注册控制器（RegistrarController）与 L2 解析器（L2Resolver）的 ABI 编解码，
//! 以及 ENS namehash。

use ethers::{
    abi::{decode, encode, ParamType, Token},
    types::{Address, Bytes, H256, U256},
    utils::keccak256,
};

pub const SIG_AVAILABLE: &str = "available(string)";
pub const SIG_MIN_REGISTRATION_DURATION: &str = "MIN_REGISTRATION_DURATION()";
pub const SIG_REGISTER_PRICE: &str = "registerPrice(string,uint256)";
pub const SIG_REGISTER: &str = "register((string,address,uint256,address,bytes[],bool))";
pub const SIG_SET_ADDR: &str = "setAddr(bytes32,address)";
pub const SIG_SET_ADDR_COIN: &str = "setAddr(bytes32,uint256,bytes)";
pub const SIG_SET_NAME: &str = "setName(bytes32,string)";

/// 注册控制器在名称已被占用时的自定义错误
pub const ERR_NAME_NOT_AVAILABLE: &str = "NameNotAvailable(string)";

/// 完整域名：`label.suffix`
pub fn full_name(label: &str, suffix: &str) -> String {
    format!("{}.{}", label, suffix.trim_matches('.'))
}

/// ENS namehash（EIP-137）
pub fn namehash(name: &str) -> H256 {
    let mut node = [0u8; 32];
    if name.is_empty() {
        return H256::from(node);
    }
    for label in name.to_lowercase().rsplit('.') {
        let label_hash = keccak256(label.as_bytes());
        let mut buf = [0u8; 64];
        buf[..32].copy_from_slice(&node);
        buf[32..].copy_from_slice(&label_hash);
        node = keccak256(buf);
    }
    H256::from(node)
}

pub fn selector(sig: &str) -> [u8; 4] {
    let hash = keccak256(sig.as_bytes());
    [hash[0], hash[1], hash[2], hash[3]]
}

pub fn encode_call(sig: &str, args: &[Token]) -> Bytes {
    let mut out = Vec::with_capacity(4 + 32 * args.len());
    out.extend_from_slice(&selector(sig));
    out.extend_from_slice(&encode(args));
    Bytes::from(out)
}

pub fn available_call(label: &str) -> Bytes {
    encode_call(SIG_AVAILABLE, &[Token::String(label.to_string())])
}

pub fn min_registration_duration_call() -> Bytes {
    encode_call(SIG_MIN_REGISTRATION_DURATION, &[])
}

pub fn register_price_call(label: &str, duration: U256) -> Bytes {
    encode_call(
        SIG_REGISTER_PRICE,
        &[Token::String(label.to_string()), Token::Uint(duration)],
    )
}

/// 注册后写入解析器的三条记录
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolverCalls {
    /// name -> address
    pub set_addr: Bytes,
    /// name -> address（指定 coin type）
    pub set_coin_addr: Bytes,
    /// name -> 反向名称
    pub set_name: Bytes,
}

impl ResolverCalls {
    pub fn build(full_name: &str, owner: Address, coin_type: u64) -> Self {
        let node = Token::FixedBytes(namehash(full_name).as_bytes().to_vec());

        Self {
            set_addr: encode_call(SIG_SET_ADDR, &[node.clone(), Token::Address(owner)]),
            set_coin_addr: encode_call(
                SIG_SET_ADDR_COIN,
                &[
                    node.clone(),
                    Token::Uint(U256::from(coin_type)),
                    Token::Bytes(owner.as_bytes().to_vec()),
                ],
            ),
            set_name: encode_call(SIG_SET_NAME, &[node, Token::String(full_name.to_string())]),
        }
    }

    pub fn to_vec(&self) -> Vec<Bytes> {
        vec![
            self.set_addr.clone(),
            self.set_coin_addr.clone(),
            self.set_name.clone(),
        ]
    }
}

/// 控制器 `register` 的请求结构
#[derive(Debug, Clone)]
pub struct RegisterRequest {
    pub name: String,
    pub owner: Address,
    pub duration: U256,
    pub resolver: Address,
    pub data: Vec<Bytes>,
    pub reverse_record: bool,
}

impl RegisterRequest {
    pub fn encode(&self) -> Bytes {
        let data = self
            .data
            .iter()
            .map(|call| Token::Bytes(call.to_vec()))
            .collect();

        encode_call(
            SIG_REGISTER,
            &[Token::Tuple(vec![
                Token::String(self.name.clone()),
                Token::Address(self.owner),
                Token::Uint(self.duration),
                Token::Address(self.resolver),
                Token::Array(data),
                Token::Bool(self.reverse_record),
            ])],
        )
    }
}

pub fn decode_bool(output: &[u8]) -> Result<bool, String> {
    decode(&[ParamType::Bool], output)
        .map_err(|e| e.to_string())?
        .into_iter()
        .next()
        .and_then(Token::into_bool)
        .ok_or_else(|| "expected bool return value".to_string())
}

pub fn decode_uint(output: &[u8]) -> Result<U256, String> {
    decode(&[ParamType::Uint(256)], output)
        .map_err(|e| e.to_string())?
        .into_iter()
        .next()
        .and_then(Token::into_uint)
        .ok_or_else(|| "expected uint256 return value".to_string())
}
