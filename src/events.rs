use alloy::rpc::types::Log;
use alloy::sol;
use alloy::sol_types::SolEvent;

sol! {
    event Transfer(address indexed from, address indexed to, uint256 value);

    function balanceOf(address account) external view returns (uint256);
}

pub fn decode_transfer_event(log: &Log) -> anyhow::Result<Transfer> {
    let log_data = log.data();
    let decoded = Transfer::decode_raw_log(log.topics(), &log_data.data)?;
    Ok(decoded)
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::{Address, B256, Bytes, LogData, U256};

    fn transfer_log(from: Address, to: Address, value: U256) -> Log {
        let topics = vec![Transfer::SIGNATURE_HASH, from.into_word(), to.into_word()];
        let data = Bytes::copy_from_slice(&value.to_be_bytes::<32>());
        Log {
            inner: alloy_primitives::Log {
                address: Address::with_last_byte(0xee),
                data: LogData::new_unchecked(topics, data),
            },
            ..Default::default()
        }
    }

    #[test]
    fn decodes_participants_from_indexed_topics() {
        let from = Address::with_last_byte(0x01);
        let to = Address::with_last_byte(0x02);
        let log = transfer_log(from, to, U256::from(1234u64));

        let event = decode_transfer_event(&log).unwrap();
        assert_eq!(event.from, from);
        assert_eq!(event.to, to);
        assert_eq!(event.value, U256::from(1234u64));
    }

    #[test]
    fn rejects_log_with_wrong_signature() {
        let mut log = transfer_log(
            Address::with_last_byte(0x01),
            Address::with_last_byte(0x02),
            U256::ZERO,
        );
        log.inner.data = LogData::new_unchecked(vec![B256::with_last_byte(0xff)], Bytes::new());

        assert!(decode_transfer_event(&log).is_err());
    }
}
