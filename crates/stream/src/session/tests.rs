use super::*;

#[test]
fn current_is_lazy_and_stable() {
	let manager = SessionManager::with_source(SequentialSource::default());
	assert_eq!(manager.generation(), 0);
	assert_eq!(manager.current().as_str(), "s1");
	assert_eq!(manager.current().as_str(), "s1");
	assert_eq!(manager.current_with_generation(), (SessionId::new("s1"), 0));
}

#[test]
fn rotate_replaces_and_bumps_generation() {
	let manager = SessionManager::with_source(SequentialSource::default());
	let first = manager.current();
	let rotated = manager.rotate();

	assert_ne!(first, rotated);
	assert_eq!(manager.current(), rotated);
	assert_eq!(manager.generation(), 1);
}

#[test]
fn rotate_before_first_use_still_counts() {
	let manager = SessionManager::with_source(SequentialSource::default());
	assert_eq!(manager.rotate().as_str(), "s1");
	assert_eq!(manager.current_with_generation(), (SessionId::new("s1"), 1));
}

#[test]
fn ulids_have_fixed_shape_and_increase() {
	let source = UlidSource::new();
	let ids: Vec<_> = (0..64).map(|_| source.next_id()).collect();
	for id in &ids {
		assert_eq!(id.as_str().len(), SESSION_ID_LEN);
		assert!(id.as_str().bytes().all(|b| CROCKFORD.contains(&b)));
	}
	for pair in ids.windows(2) {
		assert!(pair[0] < pair[1], "{} !< {}", pair[0], pair[1]);
	}
}

#[test]
fn advance_increments_within_same_millisecond() {
	assert_eq!(UlidSource::advance(None, 10, 7), (10, 7));
	assert_eq!(UlidSource::advance(Some((10, 7)), 10, 3), (10, 8));
	assert_eq!(UlidSource::advance(Some((10, 7)), 9, 3), (10, 8));
	assert_eq!(UlidSource::advance(Some((10, RANDOM_MASK)), 10, 3), (11, 0));
	assert_eq!(UlidSource::advance(Some((10, 7)), 11, 3), (11, 3));
}

#[test]
fn encoding_is_big_endian_base32() {
	assert_eq!(encode_crockford(0), "00000000000000000000000000");
	assert_eq!(encode_crockford(31), "0000000000000000000000000Z");
	assert_eq!(encode_crockford(32), "00000000000000000000000010");
}
